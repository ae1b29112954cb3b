use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, ensure, eyre},
};
use engine::{
    Config, Provider,
    batch::{BatchDocument, Job},
    config::JsonFileStore,
};
use serde::Serialize;
use serde_json::Value;

pub mod cli;

const APP_NAME: &str = "aiimgen";
const CONFIG_FILE_NAME: &str = "config.json";

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    Config::load(JsonFileStore::new(path))
        .wrap_err_with(|| format!("Failed to load config from {}", path.display()))
}

pub fn save_json_file<T: Serialize>(path: &Path, x: &T) -> Result<()> {
    Ok(fs::write(path, serde_json::to_string_pretty(x)? + "\n")?)
}

/// Stores `key` under `api_keys.<provider>` and persists the config.
pub fn set_api_key(config: &mut Config, provider: &str, key: &str) -> Result<Provider> {
    let provider: Provider = provider
        .parse()
        .map_err(|_| eyre!("Unknown provider: {provider} (expected openai or stability)"))?;
    config.set(&format!("api_keys.{}", provider.id()), key)?;
    Ok(provider)
}

/// The config document as pretty JSON, with API keys masked.
pub fn render_settings(config: &Config) -> Result<String> {
    let mut document = config.document().clone();
    if let Some(keys) = document.get_mut("api_keys").and_then(Value::as_object_mut) {
        for key in keys.values_mut() {
            if let Some(masked) = key.as_str().map(mask_key) {
                *key = Value::String(masked);
            }
        }
    }
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Keeps the last four characters of keys long enough to not give them away.
pub fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    match len {
        0 => "(not set)".into(),
        1..=8 => "*".repeat(len),
        _ => {
            let tail: String = key.chars().skip(len - 4).collect();
            format!("{}{tail}", "*".repeat(len - 4))
        }
    }
}

pub fn sample_batch() -> BatchDocument {
    let job = |prompt: &str, provider: &str, size: &str, count: i64, delay: f64| Job {
        prompt: Some(prompt.into()),
        provider: Some(provider.into()),
        size: Some(size.into()),
        count: Some(count.into()),
        delay: Some(delay.into()),
    };

    BatchDocument {
        jobs: vec![
            job("a futuristic cityscape at sunset", "openai", "1024x1024", 1, 3.0),
            job(
                "abstract geometric patterns in blue and gold",
                "stability",
                "512x512",
                2,
                2.0,
            ),
            job(
                "a serene mountain lake with reflection",
                "openai",
                "1024x1024",
                1,
                3.0,
            ),
        ],
    }
}

/// Writes [`sample_batch`] to `path`. Existing files are left alone.
pub fn write_sample_batch(path: &Path) -> Result<()> {
    ensure!(
        !path.exists(),
        "{} already exists, refusing to overwrite it",
        path.display()
    );
    save_json_file(path, &sample_batch())
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn sample_batch_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("batch.json");

        write_sample_batch(&path).unwrap();

        expect![[r#"
            {
              "jobs": [
                {
                  "prompt": "a futuristic cityscape at sunset",
                  "provider": "openai",
                  "size": "1024x1024",
                  "count": 1,
                  "delay": 3.0
                },
                {
                  "prompt": "abstract geometric patterns in blue and gold",
                  "provider": "stability",
                  "size": "512x512",
                  "count": 2,
                  "delay": 2.0
                },
                {
                  "prompt": "a serene mountain lake with reflection",
                  "provider": "openai",
                  "size": "1024x1024",
                  "count": 1,
                  "delay": 3.0
                }
              ]
            }
        "#]]
        .assert_eq(&fs::read_to_string(&path).unwrap());

        assert_eq!(BatchDocument::load(&path).unwrap(), sample_batch());
        assert!(write_sample_batch(&path).is_err());
    }

    #[test]
    fn masks_keys() {
        assert_eq!(mask_key(""), "(not set)");
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("sk-abcdefgh1234"), "***********1234");
    }

    #[test]
    fn api_keys_are_stored_and_masked() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let mut config = load_config_from(&path).unwrap();

        assert_eq!(
            set_api_key(&mut config, "stability", "st-0123456789").unwrap(),
            Provider::Stability
        );
        assert!(set_api_key(&mut config, "dalle", "x").is_err());

        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(
            reloaded.api_key(Provider::Stability).as_deref(),
            Some("st-0123456789")
        );

        expect![[r#"
            {
              "api_keys": {
                "openai": "(not set)",
                "stability": "*********6789"
              },
              "defaults": {
                "count": 1,
                "output_dir": "./images",
                "size": "1024x1024"
              }
            }"#]]
        .assert_eq(&render_settings(&reloaded).unwrap());
    }
}
