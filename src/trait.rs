use crate::{PageElement, Result};
use async_trait::async_trait;

/// Source of rendered page elements.
///
/// This trait abstracts the page-rendering layer so the harvesting core never
/// issues network calls itself: given a URL, an implementation returns the
/// page's elements in document order. [`HttpPageSource`](crate::HttpPageSource)
/// is the HTML implementation; tests substitute in-memory sources.
///
/// # Mocking Support
///
/// When the `mock` feature is enabled, this crate provides `MockPageSource`
/// that implements this trait using the `mockall` library.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait(?Send)]
pub trait PageSource {
    /// Fetch the artist discography page at `url` and return its elements.
    async fn discography_elements(&self, url: &str) -> Result<Vec<PageElement>>;

    /// Fetch the lyrics page at `url` and return its elements.
    async fn lyrics_elements(&self, url: &str) -> Result<Vec<PageElement>>;

    /// Search for an artist and return `(artist_name, discography_url)` of the
    /// first artist result.
    async fn find_artist(&self, artist: &str) -> Result<(String, String)>;
}
