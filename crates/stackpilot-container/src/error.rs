use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error(
        "コンテナランタイムに接続できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください\n  • docker ps コマンドが正常に動作するか確認してください"
    )]
    RuntimeUnavailable(String),

    #[error(
        "'{name}' という名前のリソースが既に存在します\n\nヒント:\n  • --on-conflict replace で既存コンテナを置き換えられます\n  • stackpilot reset で管理対象のリソースを削除できます"
    )]
    NameConflict { name: String },

    #[error("'{resource}' が見つかりません")]
    NotFound { resource: String },

    #[error(
        "イメージ '{image}' が見つかりません\n\nヒント:\n  • イメージ名とタグを確認してください\n  • docker pull {image} でイメージをダウンロードしてください"
    )]
    ImageNotFound { image: String },

    #[error("イメージ '{image}' のダウンロードに失敗しました: {message}")]
    ImagePull { image: String, message: String },

    #[error("ボリュームディレクトリの準備に失敗しました: {path}\n理由: {message}")]
    VolumePreparation { path: PathBuf, message: String },

    #[error("Docker APIエラー: {0}")]
    DockerApiError(String),
}

impl ContainerError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ContainerError::RuntimeUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContainerError::NotFound { .. } | ContainerError::ImageNotFound { .. }
        )
    }
}

impl From<bollard::errors::Error> for ContainerError {
    fn from(err: bollard::errors::Error) -> Self {
        match &err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => ContainerError::NotFound {
                resource: message.clone(),
            },
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409, ..
            } => {
                // 名前は呼び出し側で補う
                ContainerError::DockerApiError(err.to_string())
            }
            _ => {
                let err_str = err.to_string();
                if is_connection_error(&err_str) {
                    ContainerError::RuntimeUnavailable(err_str)
                } else {
                    ContainerError::DockerApiError(err_str)
                }
            }
        }
    }
}

fn is_connection_error(message: &str) -> bool {
    message.contains("Connection refused")
        || message.contains("No such file or directory")
        || message.contains("error trying to connect")
        || message.contains("Socket not found")
        || message.contains("Timeout error")
}

pub type Result<T> = std::result::Result<T, ContainerError>;
