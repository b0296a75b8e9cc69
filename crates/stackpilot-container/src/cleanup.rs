//! 環境のリセットとロールバック

use crate::error::Result;
use crate::runtime::{ContainerRuntime, ContainerState, ResourceScope};
use tracing::{info, warn};

/// リセットで削除したリソースの件数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub stopped_containers: usize,
    pub removed_containers: usize,
    pub removed_images: usize,
    pub removed_volumes: usize,
    pub pruned_networks: usize,
}

impl CleanupSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// ベストエフォートでリソースを削除するオペレーター
///
/// 個々の削除失敗はログに残してスキップします。
/// ランタイムに接続できなくなった場合のみ中断します。
pub struct CleanupOperator<'a, R> {
    runtime: &'a R,
}

impl<'a, R: ContainerRuntime> CleanupOperator<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// スコープ内のコンテナ・イメージ・ボリューム・ネットワークを削除
    ///
    /// 削除対象がなくても成功です。
    pub async fn reset_environment(&self, scope: &ResourceScope) -> Result<CleanupSummary> {
        let mut summary = CleanupSummary::default();
        let containers = self.runtime.list_containers(scope).await?;

        // 1. 実行中のコンテナを停止
        for container in containers
            .iter()
            .filter(|c| c.state == ContainerState::Running)
        {
            if tolerate(
                self.runtime.stop_container(&container.name).await,
                "stop container",
                &container.name,
            )? {
                summary.stopped_containers += 1;
            }
        }

        // 2. コンテナを強制削除
        for container in &containers {
            if tolerate(
                self.runtime.remove_container(&container.name).await,
                "remove container",
                &container.name,
            )? {
                summary.removed_containers += 1;
            }
        }

        // 3. 削除したコンテナが使っていたイメージとスコープ内のイメージを削除
        let mut images: Vec<String> = Vec::new();
        for image in containers
            .iter()
            .map(|c| c.image.clone())
            .chain(self.runtime.list_images(scope).await?)
        {
            if !image.is_empty() && !images.contains(&image) {
                images.push(image);
            }
        }
        for image in &images {
            if tolerate(
                self.runtime.remove_image(image).await,
                "remove image",
                image,
            )? {
                summary.removed_images += 1;
            }
        }

        // 4. ボリュームを削除
        for volume in self.runtime.list_volumes(scope).await? {
            if tolerate(
                self.runtime.remove_volume(&volume).await,
                "remove volume",
                &volume,
            )? {
                summary.removed_volumes += 1;
            }
        }

        // 5. 未使用ネットワークを削除
        match self.runtime.prune_networks(scope).await {
            Ok(pruned) => summary.pruned_networks = pruned.len(),
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => warn!(error = %e, "Failed to prune networks"),
        }

        info!(?scope, ?summary, "Environment reset finished");
        Ok(summary)
    }

    /// 指定したコンテナを削除（ロールバック用）
    ///
    /// 削除できた件数を返します。
    pub async fn teardown(&self, containers: &[String]) -> Result<usize> {
        let mut removed = 0;
        for name in containers.iter().rev() {
            if tolerate(
                self.runtime.remove_container(name).await,
                "remove container",
                name,
            )? {
                removed += 1;
            }
        }
        info!(removed, requested = containers.len(), "Rolled back containers");
        Ok(removed)
    }
}

/// 失敗をログに残してスキップし、接続不能だけは伝播する
fn tolerate(result: Result<()>, action: &str, target: &str) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_unavailable() => Err(e),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => {
            warn!(action, target, error = %e, "Cleanup step failed, skipping");
            Ok(false)
        }
    }
}
