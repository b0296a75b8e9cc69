//! 認証情報の定義

use serde::{Deserialize, Serialize};

/// 生成するシークレットのデフォルト長
pub const DEFAULT_SECRET_LENGTH: usize = 24;

/// 認証情報の取得方法
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialRule {
    /// 実行時にランダム生成
    Generated { length: usize },
    /// オペレーターに一度だけ入力を求める
    Supplied { prompt: String, secret: bool },
    /// 固定値（DB名やユーザー名など）
    Literal(String),
}

/// サービスが宣言する認証情報
///
/// KDL形式：
/// ```kdl
/// credential "password" generate=#true length=32
/// credential "admin_email" prompt="管理者メールアドレス"
/// credential "database" value="wordpress"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    pub key: String,
    pub rule: CredentialRule,
}

impl CredentialSpec {
    pub fn generated(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rule: CredentialRule::Generated {
                length: DEFAULT_SECRET_LENGTH,
            },
        }
    }

    pub fn supplied(key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rule: CredentialRule::Supplied {
                prompt: prompt.into(),
                secret: false,
            },
        }
    }

    pub fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rule: CredentialRule::Literal(value.into()),
        }
    }

    pub fn is_supplied(&self) -> bool {
        matches!(self.rule, CredentialRule::Supplied { .. })
    }
}
