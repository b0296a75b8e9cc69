//! ユーザー設定（~/.config/stackpilot/config.yaml）
//!
//! ```yaml
//! host_address: 192.168.1.10
//! report_path: /root/homelab-credentials.txt
//! on_conflict: replace
//! rollback_on_failure: false
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイル名
pub const SETTINGS_FILE: &str = "config.yaml";

/// レポートのデフォルトファイル名（ホームディレクトリ直下）
pub const DEFAULT_REPORT_FILE: &str = "stackpilot-credentials.txt";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// レポートやURLに使うホストアドレス（未指定なら自動検出）
    pub host_address: Option<String>,
    /// 認証情報レポートの出力先
    pub report_path: Option<PathBuf>,
    /// 同名コンテナがある場合の扱い（replace / fail）
    pub on_conflict: Option<String>,
    /// 失敗時に今回起動したコンテナを削除する
    pub rollback_on_failure: bool,
}

impl Settings {
    /// 設定ディレクトリの config.yaml を読み込む（なければデフォルト）
    pub fn load() -> Result<Self> {
        match crate::config_dir() {
            Ok(dir) => Self::load_from(&dir.join(SETTINGS_FILE)),
            Err(_) => Ok(Self::default()),
        }
    }

    /// 指定パスから読み込む（ファイルがなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidSettings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// レポートのデフォルト出力先（~/stackpilot-credentials.txt）
pub fn default_report_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_REPORT_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILE))
}
