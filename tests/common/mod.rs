#![allow(dead_code)]

use async_trait::async_trait;
use lyrics_harvest::{HarvestConfig, HarvestError, PageElement, PageSource, Result};
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory [`PageSource`] with scripted failures and a call log.
#[derive(Default)]
pub struct FakePageSource {
    pages: HashMap<String, Vec<PageElement>>,
    artists: HashMap<String, (String, String)>,
    failures: RefCell<HashMap<String, u32>>,
    calls: RefCell<Vec<String>>,
}

impl FakePageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, elements: Vec<PageElement>) -> Self {
        self.pages.insert(url.to_string(), elements);
        self
    }

    pub fn with_artist(mut self, query: &str, name: &str, url: &str) -> Self {
        self.artists
            .insert(query.to_lowercase(), (name.to_string(), url.to_string()));
        self
    }

    /// Make the next `times` requests for `url` fail with an HTTP error.
    pub fn failing(self, url: &str, times: u32) -> Self {
        self.failures.borrow_mut().insert(url.to_string(), times);
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| *u == url).count()
    }

    fn serve(&self, url: &str) -> Result<Vec<PageElement>> {
        self.calls.borrow_mut().push(url.to_string());
        if let Some(left) = self.failures.borrow_mut().get_mut(url) {
            if *left > 0 {
                *left -= 1;
                return Err(HarvestError::Http(format!("503 for {url}")));
            }
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| HarvestError::Http(format!("404 for {url}")))
    }
}

#[async_trait(?Send)]
impl PageSource for FakePageSource {
    async fn discography_elements(&self, url: &str) -> Result<Vec<PageElement>> {
        self.serve(url)
    }

    async fn lyrics_elements(&self, url: &str) -> Result<Vec<PageElement>> {
        self.serve(url)
    }

    async fn find_artist(&self, artist: &str) -> Result<(String, String)> {
        self.artists
            .get(&artist.to_lowercase())
            .cloned()
            .ok_or_else(|| HarvestError::ArtistNotFound(artist.to_string()))
    }
}

/// A lyrics page laid out the way the locator expects.
pub fn lyrics_page(lyrics: &str, writers: &str) -> Vec<PageElement> {
    vec![
        PageElement::block("\"Song\" lyrics"),
        PageElement::line_break(),
        PageElement::line_break(),
        PageElement::block(lyrics),
        PageElement::line_break(),
        PageElement::block("Submit Corrections"),
        PageElement::block(format!("Writer(s): {writers}")),
    ]
}

/// Config with a short throttle so paused-time tests stay quick to reason about.
pub fn test_config() -> HarvestConfig {
    HarvestConfig {
        rate_limit_cap_secs: 2,
        ..HarvestConfig::default()
    }
}

/// Two Bowie albums sharing a song title, with songwriter spellings that
/// need resolving.
pub fn bowie_source() -> FakePageSource {
    FakePageSource::new()
        .with_artist("david bowie", "David Bowie", "bowie")
        .with_page(
            "bowie",
            vec![
                PageElement::album_marker("album: \"Heroes\" (1977)"),
                PageElement::song_marker("Sound And Vision").with_link("sound-and-vision"),
                PageElement::song_marker("\"Heroes\"").with_link("heroes"),
                PageElement::song_marker("V-2 Schneider (Instrumental)"),
                PageElement::other("ad slot"),
                PageElement::album_marker("live: \"Stage\" (1978)"),
                PageElement::song_marker("\"Heroes\"").with_link("heroes-live"),
            ],
        )
        .with_page(
            "sound-and-vision",
            lyrics_page("Don't you wonder sometimes", "David Bowie"),
        )
        .with_page(
            "heroes",
            lyrics_page("I, I will be king", "David Robert Bowie, Brian Eno"),
        )
        .with_page("heroes-live", lyrics_page("We can be heroes", "Bowie, Brian Peter George Eno"))
}
