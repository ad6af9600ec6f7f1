pub mod batch;
pub mod harvest;
pub mod utils;

use clap::{Subcommand, ValueEnum};
use lyrics_harvest::CatalogFormat;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Default)]
pub enum OutputFormat {
    /// One JSON object per song and line
    #[default]
    Json,
    /// Pipe-delimited rows with a header line
    Csv,
}

impl From<OutputFormat> for CatalogFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CatalogFormat::JsonLines,
            OutputFormat::Csv => CatalogFormat::Csv,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest every song of an artist
    ///
    /// Searches for the artist, walks its discography, fetches each song's
    /// lyrics and songwriters, and writes one JSON object per song.
    ///
    /// Usage examples:
    /// # Whole discography
    /// lyrics-harvest harvest "David Bowie"
    ///
    /// # Only two songs, into a chosen file
    /// lyrics-harvest harvest "David Bowie" --songs "Heroes,Low" --output bowie.json
    ///
    /// # Pipe-delimited output
    /// lyrics-harvest harvest "David Bowie" --format csv
    Harvest {
        /// Artist name to search for
        artist: String,

        /// Output file (defaults to <artist>_lyrics.json or .csv)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Only harvest these songs (comma separated, case-insensitive)
        #[arg(long, value_delimiter = ',')]
        songs: Option<Vec<String>>,

        /// Lyrics fetches in flight at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Harvest single songs listed in a file
    ///
    /// Each line of the file reads `artist|song`. Every song is written to
    /// its own file in the output directory, and all of them are
    /// concatenated into `concat.json` (or `concat.csv`, with a single
    /// header line). Failed lines are logged and skipped.
    ///
    /// Usage examples:
    /// lyrics-harvest batch songs.txt --output-dir lyrics/ --format csv
    Batch {
        /// File with one `artist|song` pair per line
        file: PathBuf,

        /// Directory for the per-song files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

/// Shared options resolved before a command runs.
pub struct RunOptions {
    pub config: Option<PathBuf>,
}

pub async fn execute_command(
    command: Commands,
    options: &RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Harvest {
            artist,
            output,
            format,
            songs,
            concurrency,
        } => {
            let mut config = utils::load_config(options.config.as_deref())?;
            if songs.is_some() {
                config.songs = songs;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            config.validate()?;
            harvest::handle_harvest(config, &artist, output, format.into()).await
        }
        Commands::Batch {
            file,
            output_dir,
            format,
        } => {
            let config = utils::load_config(options.config.as_deref())?;
            batch::handle_batch(config, &file, &output_dir, format.into()).await
        }
    }
}
