use super::utils::create_harvester;
use lyrics_harvest::persistence::path_component;
use lyrics_harvest::{CatalogFormat, HarvestConfig, HarvestError, HarvestEvent};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;

pub async fn handle_harvest(
    config: HarvestConfig,
    artist: &str,
    output: Option<PathBuf>,
    format: CatalogFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let harvester = create_harvester(config);
    let mut events = harvester.subscribe();

    let progress = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event {
                HarvestEvent::SongHarvested {
                    song,
                    completed,
                    total,
                    ..
                } => println!("🎵 [{completed}/{total}] {song}"),
                HarvestEvent::RetryStarting {
                    operation,
                    delay_seconds,
                    attempt,
                    max_attempts,
                    ..
                } => println!(
                    "⏳ {operation} failed, retry {attempt}/{max_attempts} in {delay_seconds}s"
                ),
                _ => {}
            }
        }
    });

    println!("🔍 Searching for '{artist}'...");
    let result = harvester.harvest_artist(artist).await;
    drop(harvester);
    let _ = progress.await;

    let catalog = match result {
        Ok(catalog) => catalog,
        Err(e) => {
            if let HarvestError::BatchAborted {
                song,
                completed,
                instrumental,
                ..
            } = &e
            {
                eprintln!(
                    "❌ Stopped at '{song}' after {} songs ({} instrumental)",
                    completed.len(),
                    instrumental.len()
                );
            }
            return Err(e.into());
        }
    };

    let output = output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "{}_lyrics.{}",
            path_component(artist),
            format.extension()
        ))
    });
    format.save(&output, &catalog)?;

    println!(
        "✅ {} albums, {} songs written to {}",
        catalog.album_count(),
        catalog.song_count(),
        output.display()
    );
    Ok(())
}
