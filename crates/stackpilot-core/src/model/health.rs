//! 起動確認（ヘルスチェック）の設定と結果

use serde::{Deserialize, Serialize};

/// 起動確認の設定（固定間隔ポーリング）
///
/// KDL形式：
/// ```kdl
/// health {
///     initial_delay 3000
///     interval 1000
///     attempts 5
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// 起動要求から最初の確認までの待機時間（ミリ秒）
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// 確認間隔（ミリ秒）
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    /// 最大確認回数
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
}

fn default_initial_delay() -> u64 {
    3000
}
fn default_interval() -> u64 {
    1000
}
fn default_attempts() -> u32 {
    5
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            interval_ms: default_interval(),
            max_attempts: default_attempts(),
        }
    }
}

impl HealthCheckConfig {
    /// 待機なしの設定（テストやドライラン向け）
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay_ms: 0,
            interval_ms: 0,
            max_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStatus {
    ObservedRunning,
    NotObserved,
}

/// 1サービス分の起動確認結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub service: String,
    pub status: HealthStatus,
    pub attempts: u32,
}

impl HealthCheckResult {
    pub fn is_running(&self) -> bool {
        self.status == HealthStatus::ObservedRunning
    }
}
