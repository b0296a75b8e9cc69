//! 認証情報レポート
//!
//! 全サービスの起動確認が取れた後に一度だけ書き出します。
//! 実行開始時に前回のレポートを削除するため、失敗した実行ではレポートが残りません。

use crate::credentials::CredentialSet;
use crate::error::CredentialError;
use crate::model::ServiceSpec;
use crate::template::expand_template;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// レポートファイルのパーミッション（所有者のみ読み書き可）
pub const REPORT_FILE_MODE: u32 = 0o600;

/// 1サービス分のエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub service: String,
    pub display_name: String,
    pub addresses: Vec<String>,
    pub credentials: BTreeMap<String, String>,
}

impl ReportEntry {
    /// サービス定義と解決済みの認証情報からエントリを作成
    ///
    /// アドレスは `url` テンプレート → 公開ポート（`host:port`） → ネットワーク内ホスト名 の順で決まります。
    pub fn from_service(
        spec: &ServiceSpec,
        host: &str,
        credentials: &CredentialSet,
    ) -> Result<Self, CredentialError> {
        let lookup = |service: &str, key: &str| {
            credentials
                .get(service, key)
                .map(|v| v.to_string())
                .ok_or_else(|| CredentialError::Missing {
                    service: service.to_string(),
                    key: key.to_string(),
                })
        };

        let mut addresses = Vec::new();
        for url in &spec.urls {
            addresses.push(expand_template(url, &spec.name, host, lookup)?);
        }
        if addresses.is_empty() {
            addresses = spec
                .ports
                .iter()
                .map(|p| format!("{}:{}", host, p.host))
                .collect();
        }
        if addresses.is_empty() {
            addresses.push(spec.name.clone());
        }

        let mut values = BTreeMap::new();
        for credential in &spec.credentials {
            values.insert(credential.key.clone(), lookup(&spec.name, &credential.key)?);
        }

        Ok(Self {
            service: spec.name.clone(),
            display_name: spec.display().to_string(),
            addresses,
            credentials: values,
        })
    }
}

/// 完成したレポート
#[derive(Debug, Clone)]
pub struct CredentialReport {
    pub stack: String,
    pub generated_at: DateTime<Local>,
    pub host: String,
    pub entries: Vec<ReportEntry>,
}

impl CredentialReport {
    pub fn entry(&self, service: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.service == service)
    }

    /// テキスト形式にレンダリング
    pub fn render(&self) -> String {
        let mut lines = vec![
            "# StackPilot credentials".to_string(),
            format!("# stack:     {}", self.stack),
            format!(
                "# generated: {}",
                self.generated_at.format("%Y-%m-%d %H:%M:%S %z")
            ),
            format!("# host:      {}", self.host),
        ];

        for entry in &self.entries {
            lines.push(String::new());
            lines.push(format!("[{}] ({})", entry.display_name, entry.service));
            lines.extend(entry.addresses.iter().map(|a| format!("  address: {}", a)));
            lines.extend(
                entry
                    .credentials
                    .iter()
                    .map(|(key, value)| format!("  {}: {}", key, value)),
            );
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// 成功したサービスを順に積み上げるビルダー
#[derive(Debug)]
pub struct ReportBuilder {
    stack: String,
    host: String,
    entries: Vec<ReportEntry>,
}

impl ReportBuilder {
    pub fn new(stack: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            host: host.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 生成時刻を確定してレポートを完成させる
    pub fn finish(self) -> CredentialReport {
        CredentialReport {
            stack: self.stack,
            generated_at: Local::now(),
            host: self.host,
            entries: self.entries,
        }
    }
}

/// レポートを書き出す
///
/// 一時ファイルを `0600` で作成してから置き換えるので、途中の内容や
/// 緩いパーミッションのファイルが見えることはありません。
pub fn write_report(report: &CredentialReport, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    if tmp.exists() {
        fs::remove_file(&tmp)?;
    }

    if let Err(e) = write_temp(report, &tmp).and_then(|()| fs::rename(&tmp, path)) {
        // 平文の一時ファイルを残さない
        if let Err(cleanup) = fs::remove_file(&tmp)
            && cleanup.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temporary report");
        }
        return Err(e);
    }

    info!(path = %path.display(), entries = report.entries.len(), "Wrote credential report");
    Ok(())
}

fn write_temp(report: &CredentialReport, tmp: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(REPORT_FILE_MODE)
        .open(tmp)?;
    file.write_all(report.render().as_bytes())?;
    file.sync_all()
}

/// 前回のレポートを削除（存在しなければ何もしない）
pub fn discard_stale_report(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale credential report");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}
