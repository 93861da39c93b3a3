//! `patchloop config`: print the effective configuration.

use patchloop_config::AppConfig;

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    println!("# {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", render(&config)?);
    Ok(())
}

/// The configuration as TOML, with the API key redacted.
fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".into());
    }
    toml::to_string_pretty(&shown)
}
