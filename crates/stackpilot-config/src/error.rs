use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "スタックファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl\n\
        - ./.stackpilot/ ディレクトリ\n\
        - ~/.config/stackpilot/stack.kdl\n\
        または STACKPILOT_STACK 環境変数で直接指定できます"
    )]
    StackFileNotFound,

    #[error("STACKPILOT_STACK で指定されたファイルが存在しません: {0}")]
    StackPathMissing(PathBuf),

    #[error("設定ファイルの読み込みに失敗しました: {path}\n理由: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
