//! HTML parsing utilities for lyrics-site pages.
//!
//! This module turns fetched HTML into the flat element streams the
//! harvesting core consumes. Selector syntax stays here; the interpreter and
//! the lyrics locator only ever see [`PageElement`]s.

use crate::{ElementKind, HarvestError, PageElement, Result};
use scraper::{ElementRef, Html, Node, Selector};

const ALBUM_CLASS: &str = "album";
const SONG_CLASS: &str = "listalbum-item";
const ARTIST_RESULTS_LABEL: &str = "Artist results:";

/// Converts HTML documents into [`PageElement`] streams.
///
/// Stateless apart from the base URL used to absolutize links.
#[derive(Debug, Clone)]
pub struct ElementExtractor {
    base_url: String,
}

impl ElementExtractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Extract the album headers and song entries of a discography page.
    ///
    /// Every `div` under `#listAlbum` becomes one element, in document order:
    /// class `album` is an album marker, class `listalbum-item` a song marker
    /// carrying the first link it contains. Anything else is passed through
    /// as [`ElementKind::Other`] so the interpreter can skip it.
    pub fn discography_elements(&self, document: &Html) -> Result<Vec<PageElement>> {
        let list_selector = Selector::parse("div#listAlbum").unwrap();
        let item_selector = Selector::parse("div").unwrap();
        let link_selector = Selector::parse("a[href]").unwrap();

        let list = document
            .select(&list_selector)
            .next()
            .ok_or_else(|| HarvestError::Parse("Album list not found on page".to_string()))?;

        let mut elements = Vec::new();
        for item in list
            .select(&item_selector)
            .filter(|item| item.id() != list.id())
        {
            let class = item.value().attr("class").unwrap_or_default();
            let kind = match class {
                ALBUM_CLASS => ElementKind::AlbumMarker,
                SONG_CLASS => ElementKind::SongMarker,
                _ => ElementKind::Other,
            };

            let mut element = PageElement::new(kind, rendered_text(item));
            if !class.is_empty() {
                element = element.with_class(class);
            }
            if kind == ElementKind::SongMarker {
                if let Some(href) = item
                    .select(&link_selector)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                {
                    element = element.with_link(self.resolve_link(href));
                }
            }
            elements.push(element);
        }

        log::debug!("Extracted {} discography elements", elements.len());
        Ok(elements)
    }

    /// Extract every element inside the main text column of a lyrics page.
    ///
    /// Descendants are listed in document order: `br` tags become line
    /// breaks, `div`s become blocks carrying their rendered text, everything
    /// else is [`ElementKind::Other`].
    pub fn lyrics_elements(&self, document: &Html) -> Result<Vec<PageElement>> {
        let main_selector = Selector::parse("div.col-xs-12.col-lg-8.text-center").unwrap();

        let main = document
            .select(&main_selector)
            .next()
            .ok_or_else(|| HarvestError::Parse("Main text column not found".to_string()))?;

        let elements: Vec<PageElement> = main
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .map(|element| {
                let kind = match element.value().name() {
                    "br" => ElementKind::LineBreak,
                    "div" => ElementKind::Block,
                    _ => ElementKind::Other,
                };
                let mut page_element = PageElement::new(kind, rendered_text(element));
                if let Some(class) = element.value().attr("class") {
                    page_element = page_element.with_class(class);
                }
                page_element
            })
            .collect();

        log::debug!("Extracted {} lyrics page elements", elements.len());
        Ok(elements)
    }

    /// Find the first artist result on a search results page.
    ///
    /// Returns `(artist_name, discography_url)`. Result links read like
    /// `"1. David Bowie"`, so the leading ordinal word is dropped.
    pub fn parse_artist_search(&self, document: &Html, artist: &str) -> Result<(String, String)> {
        let panel_selector = Selector::parse("div.panel").unwrap();
        let link_selector = Selector::parse("a[href]").unwrap();

        for panel in document.select(&panel_selector) {
            if !rendered_text(panel).starts_with(ARTIST_RESULTS_LABEL) {
                continue;
            }

            let Some(link) = panel.select(&link_selector).next() else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or_default();

            let text = rendered_text(link);
            let name = text
                .split_once(' ')
                .map(|(_, rest)| rest.trim())
                .unwrap_or(text.as_str())
                .to_string();

            log::debug!("Artist search for '{artist}' matched '{name}'");
            return Ok((name, self.resolve_link(href)));
        }

        Err(HarvestError::ArtistNotFound(artist.to_string()))
    }

    /// Turn an `href` from a page into an absolute URL.
    pub fn resolve_link(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("https://{rest}")
        } else if href.starts_with('/') {
            format!("{}{href}", self.base_url)
        } else {
            let relative = href.trim_start_matches("../").trim_start_matches("./");
            format!("{}/{relative}", self.base_url)
        }
    }
}

/// Text of an element roughly as a browser renders it.
///
/// Whitespace runs in text nodes collapse to one space, `br` starts a new
/// line, and each line is trimmed.
pub fn rendered_text(element: ElementRef) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => {
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !raw.ends_with(' ') && !raw.ends_with('\n') && !raw.is_empty() {
                            raw.push(' ');
                        }
                    } else {
                        raw.push(c);
                    }
                }
            }
            Node::Element(e) if e.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }

    raw.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
