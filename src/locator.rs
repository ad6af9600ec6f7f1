//! Lyrics-block location within a lyrics page's element stream.
//!
//! Lyrics pages carry no marker on the lyrics block itself. What reliably
//! precedes it is a pair of consecutive line breaks; the block right after the
//! pair is the lyrics, and a later block labelled `Writer(s):` credits the
//! songwriters.

use crate::{ElementKind, HarvestError, PageElement, Result};
use std::collections::BTreeSet;

const WRITERS_LABEL: &str = "Writer(s):";

/// States of the locator while scanning a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    /// Looking for the first of two consecutive line breaks
    SeekingMarker,
    /// One line break seen; a second one marks the boundary
    OneBreakSeen,
    /// Boundary found; the next block is the lyrics
    LyricsNext,
    /// Lyrics captured; looking for the songwriter credit
    ScanningWriters,
}

/// Lyrics text and songwriter credit extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricsBlock {
    pub lyrics: String,
    pub songwriters: BTreeSet<String>,
}

/// Scans one lyrics page for its lyrics and songwriter blocks.
#[derive(Debug, Clone)]
pub struct LyricsLocator {
    state: LocatorState,
    lyrics: Option<String>,
    songwriters: Option<BTreeSet<String>>,
}

impl LyricsLocator {
    pub fn new() -> Self {
        Self {
            state: LocatorState::SeekingMarker,
            lyrics: None,
            songwriters: None,
        }
    }

    pub fn state(&self) -> LocatorState {
        self.state
    }

    /// Advance the state machine by one element.
    pub fn feed(&mut self, element: &PageElement) {
        let is_break = element.kind == ElementKind::LineBreak;
        let is_block = element.kind == ElementKind::Block;

        self.state = match self.state {
            LocatorState::SeekingMarker if is_break => LocatorState::OneBreakSeen,
            LocatorState::SeekingMarker => LocatorState::SeekingMarker,
            LocatorState::OneBreakSeen if is_break => LocatorState::LyricsNext,
            LocatorState::OneBreakSeen => LocatorState::SeekingMarker,
            LocatorState::LyricsNext if is_block => {
                self.lyrics = Some(element.text.clone());
                LocatorState::ScanningWriters
            }
            LocatorState::LyricsNext => LocatorState::LyricsNext,
            LocatorState::ScanningWriters => {
                if is_block
                    && self.songwriters.is_none()
                    && element.text.starts_with(WRITERS_LABEL)
                {
                    self.songwriters = Some(parse_songwriters(&element.text));
                }
                LocatorState::ScanningWriters
            }
        };
    }

    /// Finish scanning and return what was found.
    ///
    /// A page without a lyrics block is reported as
    /// [`HarvestError::LyricsNotFound`]; a missing songwriter credit is not an
    /// error and yields an empty set.
    pub fn finish(self, url: &str) -> Result<LyricsBlock> {
        let lyrics = self.lyrics.ok_or_else(|| HarvestError::LyricsNotFound {
            url: url.to_string(),
        })?;

        let songwriters = self.songwriters.unwrap_or_else(|| {
            log::debug!("No songwriter credit found at {url}");
            BTreeSet::new()
        });

        Ok(LyricsBlock {
            lyrics,
            songwriters,
        })
    }
}

impl Default for LyricsLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Locate the lyrics and songwriter blocks in a page's elements.
pub fn locate_lyrics(elements: &[PageElement], url: &str) -> Result<LyricsBlock> {
    let mut locator = LyricsLocator::new();
    for element in elements {
        locator.feed(element);
    }
    locator.finish(url)
}

/// Parse a `Writer(s): A, B, C` credit into a set of names.
pub fn parse_songwriters(text: &str) -> BTreeSet<String> {
    let names = text
        .split_once(WRITERS_LABEL)
        .map(|(_, rest)| rest)
        .unwrap_or(text);

    names
        .replace('\n', "")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
