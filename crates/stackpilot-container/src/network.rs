//! ネットワークの冪等な作成

use crate::error::{ContainerError, Result};
use crate::runtime::{ContainerRuntime, NetworkHandle, owner_labels};
use tracing::{debug, info};

/// 検査してから作成するネットワークプロビジョナー
pub struct NetworkProvisioner<'a, R> {
    runtime: &'a R,
    stack: &'a str,
}

impl<'a, R: ContainerRuntime> NetworkProvisioner<'a, R> {
    pub fn new(runtime: &'a R, stack: &'a str) -> Self {
        Self { runtime, stack }
    }

    /// ネットワークを用意する
    ///
    /// 既に存在すればそのハンドルを返し、なければ作成します。
    /// 作成が他の作成者と競合した場合は、再検査して既存のネットワークを返します。
    pub async fn ensure_network(&self, name: &str) -> Result<NetworkHandle> {
        if let Some(existing) = self.runtime.inspect_network(name).await? {
            debug!(network = name, "Network already exists");
            return Ok(existing);
        }

        match self
            .runtime
            .create_network(name, &owner_labels(self.stack))
            .await
        {
            Ok(handle) => {
                info!(network = name, id = %handle.id, "Created network");
                Ok(handle)
            }
            Err(ContainerError::NameConflict { .. }) => {
                debug!(network = name, "Network was created concurrently, re-inspecting");
                self.runtime
                    .inspect_network(name)
                    .await?
                    .ok_or_else(|| ContainerError::NameConflict {
                        name: name.to_string(),
                    })
            }
            Err(e) => Err(e),
        }
    }
}
