use super::utils::create_harvester;
use lyrics_harvest::persistence::path_component;
use lyrics_harvest::{CatalogFormat, HarvestConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Parse `artist|song` lines, skipping blank and malformed ones.
pub fn parse_batch_file(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match line.trim_end().split_once('|') {
            Some((artist, song)) => Some((artist.trim().to_string(), song.trim().to_string())),
            None => {
                log::warn!("Skipping malformed batch line: {line:?}");
                None
            }
        })
        .collect()
}

pub async fn handle_batch(
    config: HarvestConfig,
    file: &Path,
    output_dir: &Path,
    format: CatalogFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = parse_batch_file(&fs::read_to_string(file)?);
    fs::create_dir_all(output_dir)?;
    println!("📋 {} songs to harvest", entries.len());

    let mut harvester = create_harvester(config);
    let mut written: Vec<PathBuf> = Vec::new();

    for (artist, song) in entries {
        harvester.set_song_filter(Some(vec![song.clone()]));
        let path = output_dir.join(format!(
            "{}_{}_lyrics.{}",
            path_component(&artist),
            path_component(&song),
            format.extension()
        ));

        match harvester.harvest_artist(&artist).await {
            Ok(catalog) if catalog.song_count() > 0 => {
                format.save(&path, &catalog)?;
                println!("✅ {artist} - {song}");
                written.push(path);
            }
            Ok(_) => {
                log::warn!("'{song}' not found in the discography of '{artist}'");
                println!("⚠️  {artist} - {song}: not found");
            }
            Err(e) => {
                log::warn!("Failed to harvest {artist} - {song}: {e}");
                println!("❌ {artist} - {song}: {e}");
            }
        }
    }

    let concat_path = output_dir.join(format!("concat.{}", format.extension()));
    format.concatenate(written.as_slice(), &concat_path)?;
    println!(
        "📦 {} songs concatenated into {}",
        written.len(),
        concat_path.display()
    );
    Ok(())
}
