//! Interpretation of a discography page's element stream.
//!
//! A discography page is a flat list: an album header followed by that
//! album's songs, then the next header, and so on. Nothing in the stream nests
//! songs under albums, so the interpreter keeps a cursor on the current album
//! and numbers songs as they arrive.

use crate::{Album, Catalog, ElementKind, PageElement, Song};
use regex::Regex;

const INSTRUMENTAL_MARKER: &str = "(Instrumental)";

/// Album header fields parsed from text like `album: "Heroes" (1977)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumHeader {
    pub title: String,
    pub year: Option<u16>,
    pub album_type: Option<String>,
}

/// Song fields parsed from a song entry's visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongEntry {
    pub title: String,
    pub instrumental: bool,
}

/// Parser turning discography element streams into a [`Catalog`].
///
/// Stateless apart from its compiled patterns; one instance can interpret any
/// number of pages.
#[derive(Debug, Clone)]
pub struct DiscographyParser {
    title_pattern: Regex,
    year_pattern: Regex,
}

impl DiscographyParser {
    pub fn new() -> Self {
        Self {
            title_pattern: Regex::new(r#""(.*)""#).unwrap(),
            year_pattern: Regex::new(r"\(([12][0-9]{3})\)").unwrap(),
        }
    }

    /// Parse an album header.
    ///
    /// The expected shape is `<type>: "<title>" (<year>)`. When the title,
    /// year or type cannot be found, the whole text with colons removed
    /// becomes the title and year/type stay unset.
    pub fn parse_album_text(&self, text: &str) -> AlbumHeader {
        let text = text.trim_end();

        let title = self
            .title_pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        let year = self
            .year_pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u16>().ok());
        let album_type = text
            .split_once(':')
            .map(|(prefix, _)| prefix.trim().to_string());

        match (title, year, album_type) {
            (Some(title), Some(year), Some(album_type)) => AlbumHeader {
                title,
                year: Some(year),
                album_type: Some(album_type),
            },
            _ => {
                log::warn!("Could not parse album text: {text:?}");
                AlbumHeader {
                    title: text.replace(':', "").trim().to_string(),
                    year: None,
                    album_type: None,
                }
            }
        }
    }

    /// Parse a song entry, stripping the instrumental marker and newlines.
    pub fn parse_song_text(&self, text: &str) -> SongEntry {
        let instrumental = text.contains(INSTRUMENTAL_MARKER);
        let title = text
            .replace(INSTRUMENTAL_MARKER, "")
            .replace('\n', " ")
            .trim()
            .to_string();

        SongEntry {
            title,
            instrumental,
        }
    }

    /// Interpret a whole discography element stream.
    ///
    /// Albums are numbered from 1 in encounter order; songs are numbered from
    /// 1 within each album. A song entry that appears before any album header
    /// is logged and skipped. Elements of other kinds are ignored, and an
    /// empty stream yields an empty catalog.
    pub fn parse_discography(&self, elements: &[PageElement]) -> Catalog {
        let mut catalog = Catalog::new();
        let mut current_album: Option<String> = None;
        let mut album_number = 1;
        let mut track_number = 1;

        for element in elements {
            match element.kind {
                ElementKind::AlbumMarker => {
                    let header = self.parse_album_text(&element.text);
                    let mut album = Album::new(header.title, album_number);
                    album.year = header.year;
                    album.album_type = header.album_type;

                    let key = catalog.insert_album(album);
                    log::debug!("Album {album_number}: '{key}'");

                    current_album = Some(key);
                    album_number += 1;
                    track_number = 1;
                }
                ElementKind::SongMarker => {
                    let Some(album_key) = current_album.as_deref() else {
                        log::warn!(
                            "Skipping song entry {:?} found before any album header",
                            element.text
                        );
                        continue;
                    };

                    let entry = self.parse_song_text(element.text.trim_end());
                    let mut song = Song::new(entry.title, album_key, track_number);
                    song.instrumental = entry.instrumental;
                    if !song.instrumental {
                        song.lyrics_url = element.link.clone();
                        if song.lyrics_url.is_none() {
                            log::warn!("Song '{}' has no lyrics link", song.title);
                        }
                    }

                    match catalog.insert_song(song) {
                        Ok(key) => {
                            log::debug!("  Track {track_number}: '{key}'");
                            track_number += 1;
                        }
                        Err(e) => log::warn!("Skipping song entry {:?}: {e}", element.text),
                    }
                }
                _ => {}
            }
        }

        log::debug!(
            "Parsed {} albums and {} songs",
            catalog.album_count(),
            catalog.song_count()
        );
        catalog
    }
}

impl Default for DiscographyParser {
    fn default() -> Self {
        Self::new()
    }
}
