//! Orchestration of a full harvest: discography, lyrics batch, resolver.

use crate::discography::DiscographyParser;
use crate::events::{
    create_event_channel, HarvestEventEmitter, HarvestEventReceiver, HarvestEventSender,
};
use crate::locator::{locate_lyrics, LyricsBlock};
use crate::r#trait::PageSource;
use crate::resolver::resolve_songwriters;
use crate::retry::{retry_with_backoff, RetryResult};
use crate::throttle::RateLimiter;
use crate::{CancellationState, Catalog, HarvestConfig, HarvestError, Result, Song};
use futures::stream::{self, StreamExt};
use std::future::Future;

/// Outcome of a completed lyrics batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Keys of the songs whose lyrics were fetched, in completion order
    pub completed: Vec<String>,
    /// Keys of the instrumental songs, filled in without a fetch
    pub instrumental: Vec<String>,
}

/// Drives a [`PageSource`] through a complete harvest.
///
/// Every remote call goes through the retry policy in
/// [`HarvestConfig::retry`]; lyrics fetches additionally pass the rate
/// limiter. Progress is broadcast as [`HarvestEvent`](crate::HarvestEvent)s.
///
/// # Examples
///
/// ```rust,no_run
/// use lyrics_harvest::{HarvestConfig, Harvester, HttpPageSource};
///
/// # async fn example() -> lyrics_harvest::Result<()> {
/// let config = HarvestConfig::default();
/// let source = HttpPageSource::new(
///     Box::new(http_client::native::NativeClient::new()),
///     &config,
/// );
/// let harvester = Harvester::new(source, config);
///
/// let catalog = harvester.harvest_artist("David Bowie").await?;
/// for (key, album) in catalog.albums() {
///     println!("{key}: {album}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Harvester<S: PageSource> {
    source: S,
    config: HarvestConfig,
    parser: DiscographyParser,
    limiter: RateLimiter,
    cancel: CancellationState,
    events: HarvestEventSender,
}

impl<S: PageSource> Harvester<S> {
    pub fn new(source: S, config: HarvestConfig) -> Self {
        let (events, _) = create_event_channel();
        Self {
            limiter: RateLimiter::new(config.rate_limit_cap_secs),
            source,
            config,
            parser: DiscographyParser::new(),
            cancel: CancellationState::new(),
            events,
        }
    }

    /// Replace the rate limiter, e.g. with a seeded one.
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Share a cancellation flag with the caller.
    pub fn with_cancellation(mut self, cancel: CancellationState) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationState {
        &self.cancel
    }

    /// Subscribe to harvest events.
    pub fn subscribe(&self) -> HarvestEventReceiver {
        self.events.subscribe()
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Replace the song allow-list used by [`Harvester::harvest_artist`].
    pub fn set_song_filter(&mut self, songs: Option<Vec<String>>) {
        self.config.songs = songs;
    }

    /// Run `operation` under the retry policy, reporting retries as events.
    async fn with_retries<T, F, Fut>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.config.retry.max_retries;
        let result = retry_with_backoff(
            &self.config.retry,
            operation_name,
            &self.cancel,
            operation,
            |retry, delay, _| {
                self.events
                    .emit_retry_starting(operation_name, delay, retry, max_retries);
            },
        )
        .await;

        match result {
            Ok(RetryResult {
                result,
                attempts_made,
                total_retry_time,
            }) => {
                if attempts_made > 0 {
                    self.events
                        .emit_retry_succeeded(operation_name, attempts_made, total_retry_time);
                }
                Ok(result)
            }
            Err(HarvestError::FetchTerminal {
                operation,
                attempts,
                source,
            }) => {
                self.events.emit_retries_exhausted(&operation, attempts);
                Err(HarvestError::FetchTerminal {
                    operation,
                    attempts,
                    source,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Look up an artist and return `(artist_name, discography_url)`.
    pub async fn find_artist(&self, artist: &str) -> Result<(String, String)> {
        self.with_retries("artist search", || self.source.find_artist(artist))
            .await
    }

    /// Fetch and interpret one discography page.
    pub async fn load_discography(&self, url: &str) -> Result<Catalog> {
        let elements = self
            .with_retries("discography", || self.source.discography_elements(url))
            .await?;
        let catalog = self.parser.parse_discography(&elements);
        log::info!(
            "Discography at {url}: {} albums, {} songs",
            catalog.album_count(),
            catalog.song_count()
        );
        Ok(catalog)
    }

    /// Fetch one song's lyrics page and locate its lyrics and songwriters.
    ///
    /// Instrumental songs need no fetch and yield empty lyrics and no
    /// songwriters. A non-instrumental song without a lyrics link fails with
    /// [`HarvestError::MissingLocator`].
    pub async fn fetch_lyrics(&self, key: &str, song: &Song) -> Result<LyricsBlock> {
        if song.instrumental {
            return Ok(LyricsBlock {
                lyrics: String::new(),
                songwriters: Default::default(),
            });
        }

        let url = song
            .lyrics_url
            .as_deref()
            .ok_or_else(|| HarvestError::MissingLocator {
                song: key.to_string(),
            })?;

        let operation = format!("lyrics for '{key}'");
        self.with_retries(&operation, || async move {
            let elements = self.source.lyrics_elements(url).await?;
            locate_lyrics(&elements, url)
        })
        .await
    }

    /// Fetch lyrics for every song of `catalog` that has none yet.
    ///
    /// Instrumental songs are filled in directly. Other songs are fetched up
    /// to [`HarvestConfig::concurrency`] at a time, each start gated by the
    /// rate limiter, and written into the catalog as their results come in.
    /// The first song that fails terminally stops the batch with
    /// [`HarvestError::BatchAborted`], which reports both the fetched and the
    /// instrumental songs already written; fetches still in flight are
    /// dropped, and songs written before the failure keep their data.
    pub async fn harvest_lyrics(&self, catalog: &mut Catalog) -> Result<HarvestReport> {
        let mut report = HarvestReport::default();
        let mut pending = Vec::new();

        for (key, song) in catalog.songs_mut() {
            if song.lyrics.is_some() {
                continue;
            }
            if song.instrumental {
                song.lyrics = Some(String::new());
                song.songwriters.clear();
                report.instrumental.push(key.to_string());
            } else {
                pending.push((key.to_string(), song.clone()));
            }
        }

        let total = pending.len();
        log::info!(
            "Fetching lyrics for {total} songs ({} instrumental)",
            report.instrumental.len()
        );

        let mut results = stream::iter(pending)
            .map(move |(key, song)| async move {
                let result = match self.limiter.wait_turn(&self.cancel, Some(&self.events)).await {
                    Ok(_) => self.fetch_lyrics(&key, &song).await,
                    Err(e) => Err(e),
                };
                (key, result)
            })
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some((key, result)) = results.next().await {
            match result {
                Ok(block) => {
                    if let Some(song) = catalog.song_mut(&key) {
                        song.lyrics = Some(block.lyrics);
                        song.songwriters = block.songwriters;
                    }
                    report.completed.push(key.clone());
                    log::debug!("Harvested '{key}' ({}/{total})", report.completed.len());
                    self.events
                        .emit_song_harvested(&key, report.completed.len(), total);
                }
                Err(source) => {
                    log::warn!("Stopping batch at '{key}': {source}");
                    return Err(HarvestError::BatchAborted {
                        song: key,
                        completed: report.completed,
                        instrumental: report.instrumental,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Harvest everything for the discography at `url`.
    ///
    /// Applies the song allow-list, stamps `artist` on every song, fetches all
    /// lyrics and finally canonicalizes songwriter names across the batch.
    pub async fn harvest_discography(&self, artist: &str, url: &str) -> Result<Catalog> {
        let mut catalog = self.load_discography(url).await?;

        if self.config.songs.is_some() {
            catalog.retain_songs(|key, _| self.config.wants_song(key));
            log::info!("{} songs pass the song filter", catalog.song_count());
        }
        catalog.set_artist(artist);

        self.harvest_lyrics(&mut catalog).await?;
        resolve_songwriters(&mut catalog)?;
        Ok(catalog)
    }

    /// Search for `artist` and harvest its whole discography.
    pub async fn harvest_artist(&self, artist: &str) -> Result<Catalog> {
        let (name, url) = self.find_artist(artist).await?;
        log::info!("Harvesting '{name}' from {url}");
        self.harvest_discography(&name, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HarvestEvent;
    use crate::retry::RetryConfig;
    use crate::PageElement;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory page source that can fail a page a given number of times.
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<String, Vec<PageElement>>,
        failures: RefCell<HashMap<String, u32>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn page(mut self, url: &str, elements: Vec<PageElement>) -> Self {
            self.pages.insert(url.to_string(), elements);
            self
        }

        fn failing(self, url: &str, times: u32) -> Self {
            self.failures.borrow_mut().insert(url.to_string(), times);
            self
        }

        fn calls_to(&self, url: &str) -> usize {
            self.calls.borrow().iter().filter(|u| *u == url).count()
        }

        fn serve(&self, url: &str) -> Result<Vec<PageElement>> {
            self.calls.borrow_mut().push(url.to_string());
            if let Some(left) = self.failures.borrow_mut().get_mut(url) {
                if *left > 0 {
                    *left -= 1;
                    return Err(HarvestError::Http("connection reset".to_string()));
                }
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| HarvestError::Http(format!("404 {url}")))
        }
    }

    #[async_trait(?Send)]
    impl PageSource for FakeSource {
        async fn discography_elements(&self, url: &str) -> Result<Vec<PageElement>> {
            self.serve(url)
        }

        async fn lyrics_elements(&self, url: &str) -> Result<Vec<PageElement>> {
            self.serve(url)
        }

        async fn find_artist(&self, artist: &str) -> Result<(String, String)> {
            Ok((artist.to_string(), "disco".to_string()))
        }
    }

    fn lyrics_page(lyrics: &str, writers: &str) -> Vec<PageElement> {
        vec![
            PageElement::line_break(),
            PageElement::line_break(),
            PageElement::block(lyrics),
            PageElement::block(format!("Writer(s): {writers}")),
        ]
    }

    fn heroes_source() -> FakeSource {
        FakeSource::default()
            .page(
                "disco",
                vec![
                    PageElement::album_marker("album: \"Heroes\" (1977)"),
                    PageElement::song_marker("Beauty And The Beast").with_link("beauty"),
                    PageElement::song_marker("Heroes").with_link("heroes"),
                    PageElement::song_marker("V-2 Schneider (Instrumental)"),
                ],
            )
            .page("beauty", lyrics_page("Someone fetch a priest", "David Bowie"))
            .page("heroes", lyrics_page("We can be heroes", "Bowie, Brian Eno"))
    }

    fn config() -> HarvestConfig {
        HarvestConfig {
            rate_limit_cap_secs: 1,
            ..HarvestConfig::default()
        }
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_harvest_artist_end_to_end() {
        let harvester = Harvester::new(heroes_source(), config());
        let catalog = harvester.harvest_artist("David Bowie").await.unwrap();

        assert_eq!(catalog.album_count(), 1);
        assert_eq!(catalog.song_count(), 3);

        let heroes = catalog.song("Heroes").unwrap();
        assert_eq!(heroes.lyrics.as_deref(), Some("We can be heroes"));
        assert_eq!(heroes.artist.as_deref(), Some("David Bowie"));
        assert!(heroes.songwriters.contains("Bowie"));
        assert!(heroes.songwriters.contains("Brian Eno"));

        let beauty = catalog.song("Beauty And The Beast").unwrap();
        assert_eq!(beauty.songwriters.iter().collect::<Vec<_>>(), vec!["Bowie"]);

        let schneider = catalog.song("V-2 Schneider").unwrap();
        assert!(schneider.instrumental);
        assert_eq!(schneider.lyrics.as_deref(), Some(""));
        assert!(schneider.songwriters.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let source = heroes_source().failing("heroes", 5);
        let harvester = Harvester::new(source, config());
        let mut events = harvester.subscribe();

        let mut catalog = harvester.load_discography("disco").await.unwrap();
        let report = harvester.harvest_lyrics(&mut catalog).await.unwrap();

        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.instrumental, vec!["V-2 Schneider"]);
        assert_eq!(harvester.source().calls_to("heroes"), 6);

        let mut retries = 0;
        let mut succeeded = false;
        while let Ok(event) = events.try_recv() {
            match event {
                HarvestEvent::RetryStarting { .. } => retries += 1,
                HarvestEvent::RetrySucceeded { attempt, .. } => {
                    assert_eq!(attempt, 5);
                    succeeded = true;
                }
                _ => {}
            }
        }
        assert_eq!(retries, 5);
        assert!(succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_aborts_batch() {
        let source = heroes_source().failing("heroes", 6);
        let harvester = Harvester::new(source, config());

        let mut catalog = harvester.load_discography("disco").await.unwrap();
        let err = harvester.harvest_lyrics(&mut catalog).await.unwrap_err();

        match err {
            HarvestError::BatchAborted {
                song,
                completed,
                instrumental,
                source,
            } => {
                assert_eq!(song, "Heroes");
                assert_eq!(completed, vec!["Beauty And The Beast"]);
                assert_eq!(instrumental, vec!["V-2 Schneider"]);
                assert!(matches!(
                    *source,
                    HarvestError::FetchTerminal { attempts: 6, .. }
                ));
            }
            other => panic!("expected BatchAborted, got {other:?}"),
        }

        assert_eq!(harvester.source().calls_to("heroes"), 6);
        assert_eq!(
            catalog.song("Beauty And The Beast").unwrap().lyrics.as_deref(),
            Some("Someone fetch a priest")
        );
        assert!(catalog.song("Heroes").unwrap().lyrics.is_none());
        assert_eq!(
            catalog.song("V-2 Schneider").unwrap().lyrics.as_deref(),
            Some("")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_link_is_reported_without_fetch() {
        let source = FakeSource::default().page(
            "disco",
            vec![
                PageElement::album_marker("album: \"Low\" (1977)"),
                PageElement::song_marker("Speed Of Life"),
            ],
        );
        let harvester = Harvester::new(source, config());

        let mut catalog = harvester.load_discography("disco").await.unwrap();
        let err = harvester.harvest_lyrics(&mut catalog).await.unwrap_err();

        match err {
            HarvestError::BatchAborted { source, .. } => {
                assert!(matches!(*source, HarvestError::MissingLocator { .. }))
            }
            other => panic!("expected BatchAborted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_song_filter_limits_fetches() {
        let config = HarvestConfig {
            songs: Some(vec!["heroes".to_string()]),
            ..config()
        };
        let harvester = Harvester::new(heroes_source(), config);

        let catalog = harvester.harvest_discography("David Bowie", "disco").await.unwrap();

        assert_eq!(catalog.song_count(), 1);
        assert!(catalog.song("Heroes").is_some());
        assert_eq!(harvester.source().calls_to("beauty"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_batch_writes_every_song() {
        let config = HarvestConfig {
            concurrency: 3,
            retry: RetryConfig {
                max_retries: 2,
                backoff_unit_secs: 1,
            },
            ..config()
        };
        let harvester = Harvester::new(heroes_source().failing("beauty", 1), config)
            .with_rate_limiter(RateLimiter::with_seed(1, 42));

        let mut catalog = harvester.load_discography("disco").await.unwrap();
        let report = harvester.harvest_lyrics(&mut catalog).await.unwrap();

        let mut completed = report.completed.clone();
        completed.sort();
        assert_eq!(completed, vec!["Beauty And The Beast", "Heroes"]);
        assert!(catalog.songs().all(|(_, song)| song.lyrics.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_batch() {
        let harvester = Harvester::new(heroes_source(), config());
        let mut catalog = harvester.load_discography("disco").await.unwrap();

        harvester.cancellation().cancel();
        let err = harvester.harvest_lyrics(&mut catalog).await.unwrap_err();

        match err {
            HarvestError::BatchAborted {
                completed, source, ..
            } => {
                assert!(completed.is_empty());
                assert!(matches!(*source, HarvestError::Cancelled));
            }
            other => panic!("expected BatchAborted, got {other:?}"),
        }
    }
}
