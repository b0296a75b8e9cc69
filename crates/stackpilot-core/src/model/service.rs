//! サービス定義

use super::credential::CredentialSpec;
use super::port::Port;
use super::volume::VolumeMount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// サービス定義（デプロイ単位）
///
/// KDL形式：
/// ```kdl
/// service "wordpress" {
///     image "wordpress:6"
///     restart "unless-stopped"
///     depends_on "mariadb"
///     port host=8080 container=80
///     credential "database" value="wordpress"
///     env {
///         WORDPRESS_DB_PASSWORD "{{ mariadb.root_password }}"
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// 一意なサービス名（ネットワーク上のホスト名を兼ねる）
    pub name: String,
    /// レポートに表示する名前
    #[serde(default)]
    pub display_name: Option<String>,
    pub image: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub ports: Vec<Port>,
    /// 環境変数（値は `{{ service.key }}` / `{{ host }}` を参照できる）
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    /// 所属ネットワーク（未指定ならスタックのネットワーク）
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub restart: RestartPolicy,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// このサービスが宣言する認証情報
    #[serde(default)]
    pub credentials: Vec<CredentialSpec>,
    /// レポートに載せるURLテンプレート
    #[serde(default)]
    pub urls: Vec<String>,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Default::default()
        }
    }

    /// 表示名（未指定ならサービス名）
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// 宣言済みの認証情報を取得
    pub fn credential(&self, key: &str) -> Option<&CredentialSpec> {
        self.credentials.iter().find(|c| c.key == key)
    }

    /// イメージ参照（タグがなければ `latest` を補う）
    pub fn image_reference(&self) -> String {
        let last_segment = self.image.rsplit('/').next().unwrap_or(&self.image);
        if last_segment.contains(':') || self.image.contains('@') {
            self.image.clone()
        } else {
            format!("{}:latest", self.image)
        }
    }
}

/// 再起動ポリシー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// 再起動しない（デフォルト）
    #[default]
    No,
    /// 常に再起動
    Always,
    /// 異常終了時のみ再起動
    OnFailure,
    /// 明示的に停止しない限り再起動
    UnlessStopped,
}

impl RestartPolicy {
    /// 文字列からパース
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "no" => Some(Self::No),
            "always" => Some(Self::Always),
            "on-failure" | "on_failure" => Some(Self::OnFailure),
            "unless-stopped" | "unless_stopped" => Some(Self::UnlessStopped),
            _ => None,
        }
    }

    /// Docker APIで使用する文字列に変換
    pub fn as_docker_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::OnFailure => "on-failure",
            Self::UnlessStopped => "unless-stopped",
        }
    }
}

/// 同名コンテナが既に存在する場合の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// 既存コンテナを削除して作り直す
    #[default]
    Replace,
    /// NameConflict として中断する
    Fail,
}

impl ConflictPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_reference() {
        assert_eq!(
            ServiceSpec::new("db", "mariadb").image_reference(),
            "mariadb:latest"
        );
        assert_eq!(
            ServiceSpec::new("db", "mariadb:11").image_reference(),
            "mariadb:11"
        );
        assert_eq!(
            ServiceSpec::new("reg", "localhost:5000/app").image_reference(),
            "localhost:5000/app:latest"
        );
        assert_eq!(
            ServiceSpec::new("ide", "lscr.io/linuxserver/code-server:4.96").image_reference(),
            "lscr.io/linuxserver/code-server:4.96"
        );
    }

    #[test]
    fn test_restart_policy_parse() {
        assert_eq!(
            RestartPolicy::parse("unless-stopped"),
            Some(RestartPolicy::UnlessStopped)
        );
        assert_eq!(
            RestartPolicy::parse("on_failure"),
            Some(RestartPolicy::OnFailure)
        );
        assert_eq!(RestartPolicy::parse("sometimes"), None);
        assert_eq!(RestartPolicy::Always.as_docker_str(), "always");
    }

    #[test]
    fn test_display_falls_back_to_name() {
        let mut spec = ServiceSpec::new("netdata", "netdata/netdata");
        assert_eq!(spec.display(), "netdata");
        spec.display_name = Some("Netdata".to_string());
        assert_eq!(spec.display(), "Netdata");
    }
}
