use thiserror::Error;

/// Error types for harvesting operations.
///
/// This enum covers everything that can go wrong while acquiring a discography:
/// network issues, pages that did not render the expected blocks, exhausted
/// retry budgets, aborted batches and broken resolver invariants.
///
/// # Error Handling Examples
///
/// ```rust,no_run
/// use lyrics_harvest::{HarvestConfig, HarvestError, Harvester, HttpPageSource};
///
/// #[tokio::main]
/// async fn main() {
///     let config = HarvestConfig::default();
///     let source = HttpPageSource::new(
///         Box::new(http_client::native::NativeClient::new()),
///         &config,
///     );
///     let harvester = Harvester::new(source, config);
///
///     match harvester.harvest_artist("David Bowie").await {
///         Ok(catalog) => println!("Harvested {} songs", catalog.song_count()),
///         Err(HarvestError::BatchAborted { song, completed, .. }) => {
///             eprintln!("Stopped at '{song}' after {} songs", completed.len());
///         }
///         Err(e) => eprintln!("Harvest failed: {e}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum HarvestError {
    /// HTTP/network related errors.
    ///
    /// This includes connection failures, timeouts, unexpected status codes
    /// and other low-level networking issues.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A page could not be turned into the records we expected.
    #[error("Failed to parse page: {0}")]
    Parse(String),

    /// The remote source signalled that we are requesting too fast.
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimit {
        /// Number of seconds the source asked us to wait
        retry_after: u64,
    },

    /// No lyrics boundary (two consecutive line breaks followed by a block)
    /// was found on a lyrics page.
    ///
    /// Usually a rendering hiccup, so it is retried like any other transient
    /// failure.
    #[error("Lyrics block not found at {url}")]
    LyricsNotFound {
        /// The page that was scanned
        url: String,
    },

    /// A non-instrumental song has no lyrics-page link to fetch.
    #[error("Song '{song}' has no lyrics page")]
    MissingLocator {
        /// Catalog key of the song
        song: String,
    },

    /// An operation failed on every attempt of its retry budget.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    FetchTerminal {
        /// Name of the operation, for logs and reports
        operation: String,
        /// Number of attempts made, including the first one
        attempts: u32,
        /// The failure of the last attempt
        #[source]
        source: Box<HarvestError>,
    },

    /// A lyrics batch stopped at a song whose fetch failed terminally.
    ///
    /// `completed` lists, in completion order, the catalog keys of the songs
    /// whose lyrics were written before the failure, and `instrumental` the
    /// instrumental songs filled in without a fetch. Those songs keep their
    /// data; the caller decides whether the partial catalog is useful.
    #[error("Batch aborted at song '{song}' ({} songs completed): {source}", .completed.len())]
    BatchAborted {
        /// Catalog key of the song that failed
        song: String,
        /// Catalog keys of the songs that succeeded before the failure
        completed: Vec<String>,
        /// Catalog keys of the instrumental songs filled in before fetching
        instrumental: Vec<String>,
        /// The terminal failure
        #[source]
        source: Box<HarvestError>,
    },

    /// Artist search returned no artist results.
    #[error("Artist not found: {0}")]
    ArtistNotFound(String),

    /// The operation was cancelled through a [`CancellationState`](crate::CancellationState).
    #[error("Operation cancelled")]
    Cancelled,

    /// The songwriter merge or flattening did not reach a fixed point.
    ///
    /// Merging always shrinks the active name set, so this means an internal
    /// invariant is broken. It is never retried or swallowed.
    #[error("Songwriter resolution did not converge: {0}")]
    ResolutionNonconvergence(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// File system I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors from configuration or catalog files.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors writing a pipe-delimited catalog file.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl HarvestError {
    /// Whether the retry policy may attempt the operation again.
    ///
    /// Everything that comes out of a single page retrieval is transient;
    /// cancellation, exhausted budgets, missing inputs and internal invariant
    /// failures are not.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            HarvestError::Cancelled
                | HarvestError::FetchTerminal { .. }
                | HarvestError::BatchAborted { .. }
                | HarvestError::ResolutionNonconvergence(_)
                | HarvestError::Config(_)
                | HarvestError::ArtistNotFound(_)
                | HarvestError::MissingLocator { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(HarvestError::Http("timeout".to_string()).is_retryable());
        assert!(HarvestError::LyricsNotFound {
            url: "https://example.com".to_string()
        }
        .is_retryable());
        assert!(HarvestError::RateLimit { retry_after: 60 }.is_retryable());
    }

    #[test]
    fn test_terminal_errors_are_not_retryable() {
        let terminal = HarvestError::FetchTerminal {
            operation: "lyrics".to_string(),
            attempts: 6,
            source: Box::new(HarvestError::Http("boom".to_string())),
        };
        assert!(!terminal.is_retryable());
        assert!(!HarvestError::Cancelled.is_retryable());
        assert!(!HarvestError::ArtistNotFound("nobody".to_string()).is_retryable());
        assert!(!HarvestError::ResolutionNonconvergence("cycle".to_string()).is_retryable());
    }

    #[test]
    fn test_batch_aborted_message_counts_completed_songs() {
        let err = HarvestError::BatchAborted {
            song: "Heroes".to_string(),
            completed: vec!["Sound and Vision".to_string()],
            instrumental: vec!["V-2 Schneider".to_string()],
            source: Box::new(HarvestError::Http("boom".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Batch aborted at song 'Heroes' (1 songs completed): HTTP error: boom"
        );
    }
}
