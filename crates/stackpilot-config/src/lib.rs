pub mod error;
pub mod settings;

pub use error::*;
pub use settings::*;

use std::path::{Path, PathBuf};

/// スタックファイルを直接指定する環境変数
pub const STACK_PATH_ENV: &str = "STACKPILOT_STACK";

const STACK_FILE_CANDIDATES: [&str; 4] = [
    "stack.local.kdl",
    ".stack.local.kdl",
    "stack.kdl",
    ".stack.kdl",
];

/// StackPilotの設定ディレクトリ（~/.config/stackpilot）
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackpilot"))
}

/// 設定ディレクトリを取得し、なければ作成する
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir = config_dir()?;

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// スタックファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 STACKPILOT_STACK (直接パス指定)
/// 2. カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. ./.stackpilot/ ディレクトリ内: 同様の順序
/// 4. ~/.config/stackpilot/stack.kdl (グローバル設定)
pub fn find_stack_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_stack_file_from(&current_dir)
}

/// 指定ディレクトリを起点にスタックファイルを探す
pub fn find_stack_file_from(current_dir: &Path) -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Some(stack_path) = std::env::var_os(STACK_PATH_ENV) {
        let path = PathBuf::from(stack_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::StackPathMissing(path));
    }

    // 2. カレントディレクトリで検索
    if let Some(path) = first_existing(current_dir) {
        return Ok(path);
    }

    // 3. ./.stackpilot/ ディレクトリで検索
    let stack_dir = current_dir.join(".stackpilot");
    if stack_dir.is_dir()
        && let Some(path) = first_existing(&stack_dir)
    {
        return Ok(path);
    }

    // 4. グローバル設定ファイル
    if let Ok(config_dir) = config_dir() {
        let global = config_dir.join("stack.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::StackFileNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    STACK_FILE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}
