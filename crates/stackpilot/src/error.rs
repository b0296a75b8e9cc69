use stackpilot_container::ContainerError;
use stackpilot_core::{CredentialError, StackError};
use std::path::PathBuf;
use thiserror::Error;

/// 実行全体のエラー
///
/// どのエラーも実行を中断します。自動リトライはしません。
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("入力エラー: {0}")]
    Input(String),

    #[error(
        "コンテナランタイムに接続できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください\n  • docker ps コマンドが正常に動作するか確認してください"
    )]
    RuntimeUnavailable(String),

    #[error(
        "'{name}' という名前のコンテナが既に存在します\n\nヒント:\n  • --on-conflict replace で置き換えられます\n  • stackpilot reset で管理対象のリソースを削除できます"
    )]
    NameConflict { service: String, name: String },

    #[error(
        "サービス '{service}' の起動を確認できませんでした（{attempts}回確認）\n\nヒント:\n  • docker logs でコンテナのログを確認してください"
    )]
    HealthCheckTimeout { service: String, attempts: u32 },

    #[error("サービス '{service}' の認証情報 '{key}' が定義されていません")]
    MissingCredential { service: String, key: String },

    #[error("デプロイ計画が不正です: {0}")]
    InvalidPlan(String),

    #[error("コンテナ操作に失敗しました: {source}")]
    Runtime {
        service: String,
        #[source]
        source: ContainerError,
    },

    #[error("ボリュームの準備に失敗しました: {path}\n理由: {message}")]
    Volume { path: PathBuf, message: String },

    #[error("認証情報レポートを書き込めません: {path}\n理由: {message}")]
    Report { path: PathBuf, message: String },
}

impl DeployError {
    /// 失敗した工程の種類（CLIの表示用）
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Input(_) => "InputError",
            DeployError::RuntimeUnavailable(_) => "RuntimeUnavailable",
            DeployError::NameConflict { .. } => "NameConflict",
            DeployError::HealthCheckTimeout { .. } => "HealthCheckTimeout",
            DeployError::MissingCredential { .. } => "MissingCredential",
            DeployError::InvalidPlan(_) => "InvalidPlan",
            DeployError::Runtime { .. } => "RuntimeError",
            DeployError::Volume { .. } => "VolumeError",
            DeployError::Report { .. } => "ReportError",
        }
    }

    /// 失敗したサービス（特定できる場合）
    pub fn service(&self) -> Option<&str> {
        let service = match self {
            DeployError::HealthCheckTimeout { service, .. }
            | DeployError::NameConflict { service, .. }
            | DeployError::MissingCredential { service, .. }
            | DeployError::Runtime { service, .. } => service,
            _ => return None,
        };
        Some(service.as_str()).filter(|s| !s.is_empty())
    }

    /// サービス起動中のコンテナエラーを変換
    pub fn from_container(service: &str, err: ContainerError) -> Self {
        match err {
            ContainerError::RuntimeUnavailable(message) => DeployError::RuntimeUnavailable(message),
            ContainerError::NameConflict { name } => DeployError::NameConflict {
                service: service.to_string(),
                name,
            },
            ContainerError::VolumePreparation { path, message } => {
                DeployError::Volume { path, message }
            }
            other => DeployError::Runtime {
                service: service.to_string(),
                source: other,
            },
        }
    }

    pub(crate) fn report(path: &std::path::Path, err: std::io::Error) -> Self {
        DeployError::Report {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<CredentialError> for DeployError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Missing { service, key } => {
                DeployError::MissingCredential { service, key }
            }
            other => DeployError::Input(other.to_string()),
        }
    }
}

impl From<StackError> for DeployError {
    fn from(err: StackError) -> Self {
        DeployError::InvalidPlan(err.to_string())
    }
}

/// サービスに紐づかないコンテナエラー（ping・ネットワーク・リセット）
impl From<ContainerError> for DeployError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::RuntimeUnavailable(message) => DeployError::RuntimeUnavailable(message),
            ContainerError::NameConflict { name } => DeployError::NameConflict {
                service: String::new(),
                name,
            },
            ContainerError::VolumePreparation { path, message } => {
                DeployError::Volume { path, message }
            }
            other => DeployError::Runtime {
                service: String::new(),
                source: other,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
