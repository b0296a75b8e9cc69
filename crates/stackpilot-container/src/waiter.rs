//! 起動確認モジュール（固定間隔ポーリング）
//!
//! 起動要求後に初期待機し、実行中コンテナ一覧に対象が現れるかを
//! 一定間隔で確認します。指数バックオフは行いません。

use crate::error::Result;
use crate::runtime::ContainerRuntime;
use stackpilot_core::{HealthCheckConfig, HealthCheckResult, HealthStatus};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// コンテナが実行中として観測されるまで待機
///
/// # Returns
/// * `Ok(ObservedRunning)` - 上限回数内に実行中を確認
/// * `Ok(NotObserved)` - 上限回数を使い切った
/// * `Err(RuntimeUnavailable)` - ランタイムに接続できなくなった
///
/// それ以外の一覧取得エラーは失敗した試行として数えます。
pub async fn wait_until_running<R: ContainerRuntime>(
    runtime: &R,
    service: &str,
    container_name: &str,
    config: &HealthCheckConfig,
) -> Result<HealthCheckResult> {
    if config.initial_delay_ms > 0 {
        sleep(Duration::from_millis(config.initial_delay_ms)).await;
    }

    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match runtime.list_running_containers().await {
            Ok(running) if running.iter().any(|n| n == container_name) => {
                debug!(service, attempt, "Container observed running");
                return Ok(HealthCheckResult {
                    service: service.to_string(),
                    status: HealthStatus::ObservedRunning,
                    attempts: attempt,
                });
            }
            Ok(_) => {
                debug!(service, attempt, "Container not running yet");
            }
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                warn!(service, attempt, error = %e, "Failed to list running containers");
            }
        }

        // 最後の試行でなければ待機
        if attempt < max_attempts && config.interval_ms > 0 {
            sleep(Duration::from_millis(config.interval_ms)).await;
        }
    }

    Ok(HealthCheckResult {
        service: service.to_string(),
        status: HealthStatus::NotObserved,
        attempts: max_attempts,
    })
}
