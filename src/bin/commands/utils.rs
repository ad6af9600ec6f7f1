use lyrics_harvest::{HarvestConfig, Harvester, HttpPageSource};
use std::path::Path;

/// Load the config file (explicit path or default location) plus
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<HarvestConfig, Box<dyn std::error::Error>> {
    let config = HarvestConfig::load(path)?;
    log::debug!("Using config: {config:?}");
    Ok(config)
}

/// Build a harvester over the native HTTP client.
pub fn create_harvester(config: HarvestConfig) -> Harvester<HttpPageSource> {
    let http_client = http_client::native::NativeClient::new();
    let source = HttpPageSource::new(Box::new(http_client), &config);
    Harvester::new(source, config)
}
