//! 環境変数・URLテンプレートの展開
//!
//! - `{{ service.key }}`: 指定サービスの認証情報
//! - `{{ key }}`: 自サービスの認証情報
//! - `{{ host }}`: ホストアドレス

use crate::error::CredentialError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_-]+)(?:\.([A-Za-z0-9_-]+))?\s*\}\}")
        .expect("template pattern is valid")
});

/// テンプレート内の参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef<'a> {
    Host,
    Credential { service: &'a str, key: &'a str },
}

/// テンプレートを展開
///
/// 認証情報の参照は `resolve(service, key)` で解決します。
/// 解決できない参照はエラーになり、未展開のまま残ることはありません。
pub fn expand_template<F>(
    template: &str,
    current_service: &str,
    host: &str,
    mut resolve: F,
) -> Result<String, CredentialError>
where
    F: FnMut(&str, &str) -> Result<String, CredentialError>,
{
    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for caps in REFERENCE_PATTERN.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        result.push_str(&template[last..whole.start()]);

        let value = match classify(&caps, current_service) {
            TemplateRef::Host => host.to_string(),
            TemplateRef::Credential { service, key } => resolve(service, key)?,
        };
        result.push_str(&value);
        last = whole.end();
    }

    result.push_str(&template[last..]);
    Ok(result)
}

/// 環境変数マップ全体を展開
pub fn expand_environment<F>(
    environment: &BTreeMap<String, String>,
    current_service: &str,
    host: &str,
    mut resolve: F,
) -> Result<BTreeMap<String, String>, CredentialError>
where
    F: FnMut(&str, &str) -> Result<String, CredentialError>,
{
    environment
        .iter()
        .map(|(name, value)| {
            expand_template(value, current_service, host, &mut resolve)
                .map(|expanded| (name.clone(), expanded))
        })
        .collect()
}

/// テンプレートが参照する認証情報の一覧
pub fn references<'a>(template: &'a str, current_service: &'a str) -> Vec<TemplateRef<'a>> {
    REFERENCE_PATTERN
        .captures_iter(template)
        .map(|caps| classify(&caps, current_service))
        .collect()
}

fn classify<'a>(caps: &regex::Captures<'a>, current_service: &'a str) -> TemplateRef<'a> {
    let first = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    match caps.get(2) {
        Some(key) => TemplateRef::Credential {
            service: first,
            key: key.as_str(),
        },
        None if first == "host" => TemplateRef::Host,
        None => TemplateRef::Credential {
            service: current_service,
            key: first,
        },
    }
}
