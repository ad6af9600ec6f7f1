//! Data types for discographies, page elements and harvested songs.
//!
//! This module contains the core data structures used throughout the crate:
//! the tagged page elements produced by a [`PageSource`](crate::PageSource),
//! the album and song records, and the [`Catalog`] that owns them and
//! enforces the keying invariants.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::{HarvestError, Result};

// ================================================================================================
// PAGE ELEMENTS
// ================================================================================================

/// Coarse classification of one element in a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Header introducing an album in a discography listing
    AlbumMarker,
    /// One song entry in a discography listing
    SongMarker,
    /// A line break
    LineBreak,
    /// A generic block-level element carrying text
    Block,
    /// Anything else (inline markup, scripts, ads)
    Other,
}

/// One tagged element of a page, in document order.
///
/// # Examples
///
/// ```rust
/// use lyrics_harvest::{ElementKind, PageElement};
///
/// let album = PageElement::album_marker("Album: \"Heroes\" (1977)");
/// assert_eq!(album.kind, ElementKind::AlbumMarker);
///
/// let song = PageElement::song_marker("Heroes").with_link("https://example.com/heroes.html");
/// assert_eq!(song.link.as_deref(), Some("https://example.com/heroes.html"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageElement {
    /// The element's classification
    pub kind: ElementKind,
    /// Rendered text content
    pub text: String,
    /// Embedded link, if the element contains one
    pub link: Option<String>,
    /// Raw classification label from the page (e.g. a CSS class)
    pub class: Option<String>,
}

impl PageElement {
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            link: None,
            class: None,
        }
    }

    pub fn album_marker(text: impl Into<String>) -> Self {
        Self::new(ElementKind::AlbumMarker, text)
    }

    pub fn song_marker(text: impl Into<String>) -> Self {
        Self::new(ElementKind::SongMarker, text)
    }

    pub fn line_break() -> Self {
        Self::new(ElementKind::LineBreak, "")
    }

    pub fn block(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Block, text)
    }

    pub fn other(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Other, text)
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

// ================================================================================================
// ALBUMS AND SONGS
// ================================================================================================

/// An album as listed in an artist's discography.
///
/// Albums own their songs through the catalog: `songs` holds the catalog keys
/// of the album's songs, kept sorted by track number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Display title (not guaranteed unique across a discography)
    pub title: String,
    /// Release year, when the header could be parsed
    pub year: Option<u16>,
    /// 1-based position of the album within the discography
    pub number: u32,
    /// Free-text category such as "album", "EP" or "compilation"
    pub album_type: Option<String>,
    /// Catalog keys of the album's songs, sorted by track number
    #[serde(default, skip_serializing)]
    pub songs: Vec<String>,
}

impl Album {
    pub fn new(title: impl Into<String>, number: u32) -> Self {
        Self {
            title: title.into(),
            year: None,
            number,
            album_type: None,
            songs: Vec::new(),
        }
    }
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(album_type) = &self.album_type {
            write!(f, "{album_type}: ")?;
        }
        write!(f, "\"{}\"", self.title)?;
        if let Some(year) = self.year {
            write!(f, " ({year})")?;
        }
        Ok(())
    }
}

/// A song and everything harvested about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Song title as displayed in the discography
    pub title: String,
    /// Artist name, once known
    pub artist: Option<String>,
    /// 1-based track number, unique within the owning album
    pub track_number: u32,
    /// Catalog key of the owning album
    pub album: String,
    /// Link to the song's lyrics page (absent for instrumental songs)
    pub lyrics_url: Option<String>,
    /// Lyrics text, `None` until fetched; always `Some("")` for instrumentals
    /// once harvested
    pub lyrics: Option<String>,
    /// Whether the discography marks the song as instrumental
    pub instrumental: bool,
    /// Songwriter names (raw until the resolver rewrites them)
    pub songwriters: BTreeSet<String>,
}

impl Song {
    pub fn new(title: impl Into<String>, album: impl Into<String>, track_number: u32) -> Self {
        Self {
            title: title.into(),
            artist: None,
            track_number,
            album: album.into(),
            lyrics_url: None,
            lyrics: None,
            instrumental: false,
            songwriters: BTreeSet::new(),
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.track_number, self.title)?;
        if self.instrumental {
            write!(f, " (Instrumental)")?;
        }
        Ok(())
    }
}

// ================================================================================================
// CATALOG
// ================================================================================================

/// The albums and songs of one discography, keyed for lookup.
///
/// Construction is two-phase: albums are inserted first, then songs are
/// attached to an existing album by key. Keys never collide: a recurring song
/// title is qualified with its album's title, and a recurring album title
/// with its ordinal, so no record silently overwrites another.
///
/// # Examples
///
/// ```rust
/// use lyrics_harvest::{Album, Catalog, Song};
///
/// let mut catalog = Catalog::new();
/// let low = catalog.insert_album(Album::new("Low", 1));
/// let live = catalog.insert_album(Album::new("Stage", 2));
///
/// catalog.insert_song(Song::new("Breaking Glass", &low, 1)).unwrap();
/// let key = catalog.insert_song(Song::new("Breaking Glass", &live, 1)).unwrap();
///
/// assert_eq!(key, "Breaking Glass (Stage)");
/// assert_eq!(catalog.song_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    albums: Vec<(String, Album)>,
    album_index: HashMap<String, usize>,
    songs: Vec<(String, Song)>,
    song_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an album and return its catalog key.
    ///
    /// The key is the title, or `"Title (n)"` when an album with the same
    /// title is already present.
    pub fn insert_album(&mut self, album: Album) -> String {
        let key = if self.album_index.contains_key(&album.title) {
            self.free_key(
                &self.album_index,
                format!("{} ({})", album.title, album.number),
            )
        } else {
            album.title.clone()
        };

        self.album_index.insert(key.clone(), self.albums.len());
        self.albums.push((key.clone(), album));
        key
    }

    /// Attach a song to the album named by `song.album` and return its key.
    ///
    /// Fails with [`HarvestError::Parse`] if the album is not in the catalog.
    pub fn insert_song(&mut self, song: Song) -> Result<String> {
        let album_pos = *self.album_index.get(&song.album).ok_or_else(|| {
            HarvestError::Parse(format!(
                "Song '{}' refers to unknown album '{}'",
                song.title, song.album
            ))
        })?;

        let key = if self.song_index.contains_key(&song.title) {
            let album_title = &self.albums[album_pos].1.title;
            self.free_key(
                &self.song_index,
                format!("{} ({})", song.title, album_title),
            )
        } else {
            song.title.clone()
        };

        let track_number = song.track_number;
        self.song_index.insert(key.clone(), self.songs.len());
        self.songs.push((key.clone(), song));

        let album_songs = &self.albums[album_pos].1.songs;
        let insert_at = album_songs.partition_point(|existing| {
            self.song(existing)
                .is_some_and(|s| s.track_number <= track_number)
        });
        self.albums[album_pos].1.songs.insert(insert_at, key.clone());

        Ok(key)
    }

    fn free_key(&self, index: &HashMap<String, usize>, candidate: String) -> String {
        if !index.contains_key(&candidate) {
            return candidate;
        }
        (2..)
            .map(|n| format!("{candidate} #{n}"))
            .find(|key| !index.contains_key(key))
            .unwrap_or(candidate)
    }

    pub fn album(&self, key: &str) -> Option<&Album> {
        self.album_index.get(key).map(|&i| &self.albums[i].1)
    }

    pub fn song(&self, key: &str) -> Option<&Song> {
        self.song_index.get(key).map(|&i| &self.songs[i].1)
    }

    pub fn song_mut(&mut self, key: &str) -> Option<&mut Song> {
        self.song_index.get(key).map(|&i| &mut self.songs[i].1)
    }

    /// Albums with their keys, in discography order.
    pub fn albums(&self) -> impl Iterator<Item = (&str, &Album)> {
        self.albums.iter().map(|(k, a)| (k.as_str(), a))
    }

    /// Songs with their keys, in insertion order.
    pub fn songs(&self) -> impl Iterator<Item = (&str, &Song)> {
        self.songs.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn songs_mut(&mut self) -> impl Iterator<Item = (&str, &mut Song)> {
        self.songs.iter_mut().map(|(k, s)| (k.as_str(), s))
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn song_count(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty() && self.songs.is_empty()
    }

    /// Set the artist name on every song.
    pub fn set_artist(&mut self, artist: &str) {
        for (_, song) in &mut self.songs {
            song.artist = Some(artist.to_string());
        }
    }

    /// Keep only the songs for which `keep` returns true.
    ///
    /// Removed songs also disappear from their album's song list; albums are
    /// kept even when they end up empty.
    pub fn retain_songs<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &Song) -> bool,
    {
        self.songs.retain(|(key, song)| keep(key, song));
        self.song_index = self
            .songs
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();

        let song_index = &self.song_index;
        for (_, album) in &mut self.albums {
            album.songs.retain(|key| song_index.contains_key(key));
        }
    }

    /// A read-only view of one album and its songs.
    pub fn album_view(&self, key: &str) -> Option<AlbumView<'_>> {
        self.album(key).map(|album| AlbumView {
            album,
            catalog: self,
        })
    }
}

/// Borrowed view over an album that resolves its songs through the catalog.
#[derive(Debug, Clone, Copy)]
pub struct AlbumView<'a> {
    album: &'a Album,
    catalog: &'a Catalog,
}

impl<'a> AlbumView<'a> {
    pub fn album(&self) -> &'a Album {
        self.album
    }

    /// The album's songs, sorted by track number.
    pub fn songs(&self) -> Vec<&'a Song> {
        self.album
            .songs
            .iter()
            .filter_map(|key| self.catalog.song(key))
            .collect()
    }

    /// Track number → song title.
    pub fn tracklist(&self) -> BTreeMap<u32, &'a str> {
        self.songs()
            .into_iter()
            .map(|song| (song.track_number, song.title.as_str()))
            .collect()
    }

    pub fn song_title(&self, track_number: u32) -> Option<&'a str> {
        self.tracklist().get(&track_number).copied()
    }

    pub fn song_titles(&self) -> Vec<&'a str> {
        self.tracklist().into_values().collect()
    }

    /// Lyrics of every song in track order; unfetched lyrics count as empty.
    pub fn lyrics_list(&self) -> Vec<&'a str> {
        self.songs()
            .into_iter()
            .map(|song| song.lyrics.as_deref().unwrap_or(""))
            .collect()
    }

    pub fn joined_lyrics(&self, delimiter: &str) -> String {
        self.lyrics_list().join(delimiter)
    }

    /// Every songwriter credited on at least one song of the album.
    pub fn songwriters(&self) -> BTreeSet<&'a str> {
        self.songs()
            .into_iter()
            .flat_map(|song| song.songwriters.iter().map(String::as_str))
            .collect()
    }

    /// Songwriter → number of the album's songs they are credited on.
    pub fn songwriters_count(&self) -> BTreeMap<&'a str, usize> {
        let mut counts = BTreeMap::new();
        for song in self.songs() {
            for writer in &song.songwriters {
                *counts.entry(writer.as_str()).or_insert(0) += 1;
            }
        }
        counts
    }
}
