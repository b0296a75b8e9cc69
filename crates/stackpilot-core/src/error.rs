use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("無効なデプロイ計画: {0}")]
    InvalidPlan(String),

    #[error("サービス名が重複しています: {0}")]
    DuplicateService(String),

    #[error(
        "サービス '{service}' が存在しないサービス '{dependency}' に依存しています\n\nヒント:\n  • depends_on の名前を確認してください"
    )]
    UnknownDependency { service: String, dependency: String },

    #[error("循環依存が検出されました: {}", .0.join(" → "))]
    CircularDependency(Vec<String>),

    #[error("サービス '{0}' に image が指定されていません")]
    MissingImage(String),
}

impl StackError {
    /// 計画構築時の検証エラー（InvalidPlan系）かどうか
    pub fn is_invalid_plan(&self) -> bool {
        matches!(
            self,
            StackError::InvalidPlan(_)
                | StackError::DuplicateService(_)
                | StackError::UnknownDependency { .. }
                | StackError::CircularDependency(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StackError>;

/// 認証情報の解決エラー
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(
        "サービス '{service}' の '{key}' が入力されていません\n\nヒント:\n  • 空の値は使用できません"
    )]
    BlankInput { service: String, key: String },

    #[error("サービス '{service}' に認証情報 '{key}' の定義がありません")]
    Missing { service: String, key: String },

    #[error("入力の読み込みに失敗しました: {0}")]
    Prompt(#[from] std::io::Error),
}
