//! # lyrics-harvest
//!
//! Harvest an artist's discography, lyrics and songwriter credits from a
//! lyrics website into a structured [`Catalog`].
//!
//! The pipeline has four parts:
//!
//! - [`discography`] interprets a flat stream of page elements into albums
//!   and songs with stable, collision-free keys.
//! - [`Harvester`] fetches every song's lyrics page under a bounded retry
//!   policy ([`retry`]) and a randomized rate limiter ([`throttle`]).
//! - [`locator`] finds the lyrics block and songwriter credit on each page.
//! - [`resolver`] merges free-text songwriter names into canonical identities.
//!
//! Pages come from a [`PageSource`]; [`HttpPageSource`] is the HTML
//! implementation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lyrics_harvest::{persistence, HarvestConfig, Harvester, HttpPageSource};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> lyrics_harvest::Result<()> {
//!     let config = HarvestConfig::load(None)?;
//!     let source = HttpPageSource::new(
//!         Box::new(http_client::native::NativeClient::new()),
//!         &config,
//!     );
//!     let harvester = Harvester::new(source, config);
//!
//!     let catalog = harvester.harvest_artist("David Bowie").await?;
//!     persistence::save_catalog(Path::new("david_bowie_lyrics.json"), &catalog)?;
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod config;
pub mod discography;
pub mod error;
pub mod events;
pub mod harvester;
pub mod headers;
pub mod locator;
pub mod parsing;
pub mod persistence;
pub mod resolver;
pub mod retry;
pub mod throttle;
pub mod r#trait;
pub mod types;
pub mod words;

pub use cancel::CancellationState;
pub use client::HttpPageSource;
pub use config::HarvestConfig;
pub use discography::DiscographyParser;
pub use error::HarvestError;
pub use events::{HarvestEvent, HarvestEventReceiver};
pub use harvester::{HarvestReport, Harvester};
pub use locator::{LyricsBlock, LyricsLocator};
pub use parsing::ElementExtractor;
pub use persistence::{CatalogFormat, CatalogWriter, CsvCatalogWriter, JsonLinesWriter};
pub use r#trait::PageSource;
pub use retry::RetryConfig;
pub use types::{Album, AlbumView, Catalog, ElementKind, PageElement, Song};

#[cfg(feature = "mock")]
pub use r#trait::MockPageSource;

pub type Result<T> = std::result::Result<T, HarvestError>;
