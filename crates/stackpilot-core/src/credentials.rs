//! 認証情報の解決
//!
//! サービスが宣言した認証情報を、実行中に一度だけ解決してキャッシュします。
//! - 生成: `OsRng` による英数字のランダム値
//! - 入力: プロンプトに一度だけ問い合わせる（空入力はエラー）
//! - 固定値: 宣言された値をそのまま使う
//!
//! このモジュールはディスクに何も書き込みません。

use crate::error::CredentialError;
use crate::model::CredentialRule;
use crate::plan::DeploymentPlan;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use tracing::debug;

/// オペレーターへの入力要求
pub trait CredentialPrompt {
    /// 値を一つ問い合わせる
    fn ask(&mut self, service: &str, key: &str, prompt: &str, secret: bool) -> io::Result<String>;
}

impl<P: CredentialPrompt + ?Sized> CredentialPrompt for &mut P {
    fn ask(&mut self, service: &str, key: &str, prompt: &str, secret: bool) -> io::Result<String> {
        (**self).ask(service, key, prompt, secret)
    }
}

/// 解決済みの認証情報（サービス名 → キー → 値）
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    values: BTreeMap<String, BTreeMap<String, String>>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, service: &str, key: &str) -> Option<&str> {
        self.values
            .get(service)
            .and_then(|keys| keys.get(key))
            .map(|v| v.as_str())
    }

    /// サービスの認証情報一覧
    pub fn service(&self, service: &str) -> Option<&BTreeMap<String, String>> {
        self.values.get(service)
    }

    /// 値を登録（既に値がある場合は上書きせず既存の値を返す）
    pub fn insert(&mut self, service: &str, key: &str, value: String) -> &str {
        self.values
            .entry(service.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(value)
    }

    /// 登録済みの値の数
    pub fn len(&self) -> usize {
        self.values.values().map(|keys| keys.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// 値はログに出さない
impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.values
                    .iter()
                    .map(|(service, keys)| (service, keys.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}

/// 実行単位の認証情報マネージャー
pub struct CredentialManager<P> {
    rules: BTreeMap<String, BTreeMap<String, CredentialRule>>,
    /// 入力要求の順序（計画順）
    supplied: Vec<(String, String)>,
    credentials: CredentialSet,
    prompt: P,
}

impl<P: CredentialPrompt> CredentialManager<P> {
    pub fn new(plan: &DeploymentPlan, prompt: P) -> Self {
        let mut rules: BTreeMap<String, BTreeMap<String, CredentialRule>> = BTreeMap::new();
        let mut supplied = Vec::new();

        for service in plan.services() {
            let entry = rules.entry(service.name.clone()).or_default();
            for credential in &service.credentials {
                if credential.is_supplied() {
                    supplied.push((service.name.clone(), credential.key.clone()));
                }
                entry.insert(credential.key.clone(), credential.rule.clone());
            }
        }

        Self {
            rules,
            supplied,
            credentials: CredentialSet::new(),
            prompt,
        }
    }

    /// 入力が必要な認証情報をすべて先に問い合わせる
    ///
    /// コンテナ操作を始める前に呼び出し、空入力があればここで中断します。
    pub fn collect_operator_input(&mut self) -> Result<(), CredentialError> {
        let supplied = self.supplied.clone();
        for (service, key) in supplied {
            self.resolve(&service, &key)?;
        }
        Ok(())
    }

    /// 認証情報を解決
    ///
    /// 一度解決した値は実行中キャッシュされ、以降は同じ値を返します。
    pub fn resolve(&mut self, service: &str, key: &str) -> Result<String, CredentialError> {
        if let Some(value) = self.credentials.get(service, key) {
            return Ok(value.to_string());
        }

        let rule = self
            .rules
            .get(service)
            .and_then(|keys| keys.get(key))
            .ok_or_else(|| CredentialError::Missing {
                service: service.to_string(),
                key: key.to_string(),
            })?;

        let value = match rule {
            CredentialRule::Generated { length } => {
                debug!(service, key, "Generating credential");
                generate_secret(*length)
            }
            CredentialRule::Literal(value) => value.clone(),
            CredentialRule::Supplied { prompt, secret } => {
                let (prompt, secret) = (prompt.clone(), *secret);
                debug!(service, key, "Prompting for credential");
                let input = self.prompt.ask(service, key, &prompt, secret)?;
                let input = input.trim();
                if input.is_empty() {
                    return Err(CredentialError::BlankInput {
                        service: service.to_string(),
                        key: key.to_string(),
                    });
                }
                input.to_string()
            }
        };

        Ok(self.credentials.insert(service, key, value).to_string())
    }

    /// サービスが宣言した認証情報をすべて解決
    pub fn resolve_service(&mut self, service: &str) -> Result<(), CredentialError> {
        let keys: Vec<String> = self
            .rules
            .get(service)
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        for key in keys {
            self.resolve(service, &key)?;
        }
        Ok(())
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn into_credentials(self) -> CredentialSet {
        self.credentials
    }
}

/// 英数字のランダムなシークレットを生成
pub fn generate_secret(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
