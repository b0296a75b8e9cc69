//! オペレーター入力の取得方法

use stackpilot_core::CredentialPrompt;
use std::io::{self, BufRead, Write};

/// 環境変数名の接頭辞
pub const PROMPT_ENV_PREFIX: &str = "STACKPILOT";

/// 標準入力から対話的に読み込む
pub struct StdinPrompt<R> {
    input: R,
}

impl StdinPrompt<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> StdinPrompt<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> CredentialPrompt for StdinPrompt<R> {
    fn ask(&mut self, service: &str, key: &str, prompt: &str, secret: bool) -> io::Result<String> {
        let mut stderr = io::stderr();
        if secret {
            writeln!(stderr, "  ⚠ 入力内容は画面に表示されます")?;
        }
        write!(stderr, "  ? {} ({}.{}): ", prompt, service, key)?;
        stderr.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// 環境変数 `STACKPILOT_<SERVICE>_<KEY>` から読み込む（非対話）
///
/// 未設定の場合は空文字を返し、空入力として扱われます。
#[derive(Debug, Default)]
pub struct EnvPrompt;

impl EnvPrompt {
    /// サービス名とキーから環境変数名を作る
    pub fn variable_name(service: &str, key: &str) -> String {
        let normalize = |s: &str| -> String {
            s.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect()
        };
        format!(
            "{}_{}_{}",
            PROMPT_ENV_PREFIX,
            normalize(service),
            normalize(key)
        )
    }
}

impl CredentialPrompt for EnvPrompt {
    fn ask(&mut self, service: &str, key: &str, _prompt: &str, _secret: bool) -> io::Result<String> {
        Ok(std::env::var(Self::variable_name(service, key)).unwrap_or_default())
    }
}
