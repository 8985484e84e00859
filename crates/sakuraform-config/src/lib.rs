pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{PollOverride, PollingSettings, Settings, TimeoutSettings};

use std::path::PathBuf;

const CONFIG_PATH_ENV: &str = "SAKURAFORM_CONFIG_PATH";
const CANDIDATES: [&str; 4] = [
    "sakuraform.local.yaml",
    ".sakuraform.local.yaml",
    "sakuraform.yaml",
    ".sakuraform.yaml",
];

/// sakuraform のグローバル設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("sakuraform");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 SAKURAFORM_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: sakuraform.local.yaml, .sakuraform.local.yaml, sakuraform.yaml, .sakuraform.yaml
/// 3. ./.sakuraform/ ディレクトリ内: 同様の順序
/// 4. ~/.config/sakuraform/config.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points to a missing file: {}",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(".sakuraform");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("sakuraform").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// 設定を読み込む。ファイルが無ければ既定値
pub fn load_settings() -> Result<Settings> {
    match find_config_file() {
        Ok(path) => {
            tracing::debug!("Loading settings from {}", path.display());
            Settings::load(&path)
        }
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using defaults");
            Ok(Settings::default())
        }
        Err(err) => Err(err),
    }
}
