use crate::words::{num_unique_words, num_words};
use crate::{Album, Catalog, HarvestError, Result, Song};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Destination for a harvested catalog.
pub trait CatalogWriter {
    fn write_catalog(&mut self, catalog: &Catalog) -> Result<()>;
}

/// One line of the JSON-lines catalog format.
///
/// Each song embeds a copy of its album record (without the song list) so a
/// single line is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub title: String,
    pub artist: Option<String>,
    pub track_number: u32,
    pub album: Album,
    pub lyrics_url: Option<String>,
    pub lyrics: Option<String>,
    pub instrumental: bool,
    pub songwriters: Vec<String>,
    #[serde(default)]
    pub num_words: usize,
    #[serde(default)]
    pub num_unique_words: usize,
}

impl SongRecord {
    fn from_song(song: &Song, album: &Album) -> Self {
        let lyrics = song.lyrics.as_deref().unwrap_or_default();
        Self {
            title: song.title.clone(),
            artist: song.artist.clone(),
            track_number: song.track_number,
            album: Album {
                songs: Vec::new(),
                ..album.clone()
            },
            lyrics_url: song.lyrics_url.clone(),
            lyrics: song.lyrics.clone(),
            instrumental: song.instrumental,
            songwriters: song.songwriters.iter().cloned().collect(),
            num_words: num_words(lyrics),
            num_unique_words: num_unique_words(lyrics),
        }
    }
}

/// Writes one JSON object per song, one song per line.
pub struct JsonLinesWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> CatalogWriter for JsonLinesWriter<W> {
    fn write_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        for (key, song) in catalog.songs() {
            let album = catalog.album(&song.album).ok_or_else(|| {
                HarvestError::Parse(format!("Song '{key}' refers to unknown album '{}'", song.album))
            })?;
            serde_json::to_writer(&mut self.writer, &SongRecord::from_song(song, album))?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        log::debug!("Wrote {} songs", catalog.song_count());
        Ok(())
    }
}

/// Write `catalog` as JSON lines to `path`.
pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    JsonLinesWriter::create(path)?.write_catalog(catalog)?;
    log::info!("Saved {} songs to {}", catalog.song_count(), path.display());
    Ok(())
}

/// Read a JSON-lines catalog back.
///
/// Albums are created first, one per distinct `(title, number)` pair, then
/// every song is attached to its album. Song keys follow the same collision
/// rules as a freshly parsed discography.
pub fn read_catalog<R: BufRead>(reader: R) -> Result<Catalog> {
    let mut records = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SongRecord = serde_json::from_str(&line).map_err(|e| {
            HarvestError::Parse(format!("Invalid song record on line {}: {e}", line_number + 1))
        })?;
        records.push(record);
    }

    build_catalog(records)
}

/// Two-phase construction shared by every reader.
fn build_catalog(records: Vec<SongRecord>) -> Result<Catalog> {
    let mut catalog = Catalog::new();
    let mut album_keys: HashMap<(String, u32), String> = HashMap::new();

    let mut albums: Vec<&Album> = records.iter().map(|record| &record.album).collect();
    albums.sort_by_key(|album| album.number);
    for album in albums {
        let id = (album.title.clone(), album.number);
        if !album_keys.contains_key(&id) {
            let key = catalog.insert_album(Album {
                songs: Vec::new(),
                ..album.clone()
            });
            album_keys.insert(id, key);
        }
    }

    for record in records {
        let album_key = &album_keys[&(record.album.title.clone(), record.album.number)];
        let song = Song {
            title: record.title,
            artist: record.artist,
            track_number: record.track_number,
            album: album_key.clone(),
            lyrics_url: record.lyrics_url,
            lyrics: record.lyrics,
            instrumental: record.instrumental,
            songwriters: record.songwriters.into_iter().collect(),
        };
        catalog.insert_song(song)?;
    }

    Ok(catalog)
}

/// Load a JSON-lines catalog from `path`.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let catalog = read_catalog(BufReader::new(File::open(path)?))?;
    log::info!(
        "Loaded {} albums and {} songs from {}",
        catalog.album_count(),
        catalog.song_count(),
        path.display()
    );
    Ok(catalog)
}

/// One row of the pipe-delimited catalog format.
///
/// Newlines in lyrics are flattened to two spaces so every song stays on one
/// line; the album type and lyrics URL are not part of this format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvSongRow {
    pub title: String,
    pub artist: Option<String>,
    pub track_number: u32,
    pub album: String,
    pub year: Option<u16>,
    pub album_number: u32,
    pub instrumental: bool,
    /// Sorted songwriter names joined with commas
    pub songwriters: String,
    pub lyrics: String,
    pub words: usize,
    pub unique_words: usize,
}

impl CsvSongRow {
    fn from_song(song: &Song, album: &Album) -> Self {
        let lyrics = song.lyrics.as_deref().unwrap_or_default();
        Self {
            title: song.title.clone(),
            artist: song.artist.clone(),
            track_number: song.track_number,
            album: album.title.clone(),
            year: album.year,
            album_number: album.number,
            instrumental: song.instrumental,
            songwriters: song
                .songwriters
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(","),
            lyrics: lyrics.replace('\n', "  "),
            words: num_words(lyrics),
            unique_words: num_unique_words(lyrics),
        }
    }

    fn into_record(self) -> SongRecord {
        let lyrics = if self.lyrics.is_empty() && !self.instrumental {
            None
        } else {
            Some(self.lyrics)
        };
        let mut album = Album::new(self.album, self.album_number);
        album.year = self.year;

        SongRecord {
            title: self.title,
            artist: self.artist,
            track_number: self.track_number,
            album,
            lyrics_url: None,
            lyrics,
            instrumental: self.instrumental,
            songwriters: self
                .songwriters
                .split(',')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            num_words: self.words,
            num_unique_words: self.unique_words,
        }
    }
}

/// Writes a header line and then one `|`-delimited row per song.
pub struct CsvCatalogWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvCatalogWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .delimiter(b'|')
                .from_writer(writer),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| HarvestError::Io(e.into_error()))
    }
}

impl CsvCatalogWriter<File> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> CatalogWriter for CsvCatalogWriter<W> {
    fn write_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        for (key, song) in catalog.songs() {
            let album = catalog.album(&song.album).ok_or_else(|| {
                HarvestError::Parse(format!("Song '{key}' refers to unknown album '{}'", song.album))
            })?;
            self.writer.serialize(CsvSongRow::from_song(song, album))?;
        }
        self.writer.flush()?;
        log::debug!("Wrote {} CSV rows", catalog.song_count());
        Ok(())
    }
}

/// Read a pipe-delimited catalog back, with the same two-phase construction
/// as [`read_catalog`].
pub fn read_catalog_csv<R: Read>(reader: R) -> Result<Catalog> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b'|').from_reader(reader);

    let mut records = Vec::new();
    for (row_number, row) in reader.deserialize::<CsvSongRow>().enumerate() {
        let row = row.map_err(|e| {
            HarvestError::Parse(format!("Invalid song row {}: {e}", row_number + 1))
        })?;
        records.push(row.into_record());
    }

    build_catalog(records)
}

/// On-disk catalog encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogFormat {
    /// One JSON object per line.
    #[default]
    JsonLines,
    /// `|`-delimited rows under a single header line.
    Csv,
}

impl CatalogFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CatalogFormat::JsonLines => "json",
            CatalogFormat::Csv => "csv",
        }
    }

    /// Write `catalog` to `path` in this format.
    pub fn save(self, path: &Path, catalog: &Catalog) -> Result<()> {
        match self {
            CatalogFormat::JsonLines => save_catalog(path, catalog),
            CatalogFormat::Csv => {
                CsvCatalogWriter::create(path)?.write_catalog(catalog)?;
                log::info!("Saved {} songs to {}", catalog.song_count(), path.display());
                Ok(())
            }
        }
    }

    /// Load a catalog written in this format.
    pub fn load(self, path: &Path) -> Result<Catalog> {
        match self {
            CatalogFormat::JsonLines => load_catalog(path),
            CatalogFormat::Csv => read_catalog_csv(BufReader::new(File::open(path)?)),
        }
    }

    /// Concatenate catalog files into `output`.
    ///
    /// CSV inputs keep only the first file's header line.
    pub fn concatenate(self, inputs: &[impl AsRef<Path>], output: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(output)?);

        for (index, input) in inputs.iter().enumerate() {
            let skip_header = self == CatalogFormat::Csv && index > 0;
            let reader = BufReader::new(File::open(input.as_ref())?);
            for line in reader.lines().skip(usize::from(skip_header)) {
                writer.write_all(line?.as_bytes())?;
                writer.write_all(b"\n")?;
            }
        }

        writer.flush()?;
        log::info!("Concatenated {} files into {}", inputs.len(), output.display());
        Ok(())
    }
}

/// Make `text` usable as a single file-name component.
pub fn path_component(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '*' | '?'))
        .map(|c| match c {
            '/' | '\\' | '|' | ':' | ' ' | '.' | '\n' => '_',
            other => other,
        })
        .collect()
}
