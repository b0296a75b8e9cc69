//! サービスの起動

use crate::converter::build_run_request;
use crate::error::{ContainerError, Result};
use crate::runtime::ContainerRuntime;
use crate::waiter::wait_until_running;
use nix::unistd::{Gid, Uid, chown};
use stackpilot_core::{
    ConflictPolicy, HealthCheckConfig, HealthCheckResult, ServiceSpec, VolumeMount, VolumeSource,
};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tracing::{debug, info, instrument};

/// サービスを1つずつ起動し、起動確認まで行う
pub struct ServiceLauncher<'a, R> {
    runtime: &'a R,
    stack: &'a str,
    conflict: ConflictPolicy,
    health: HealthCheckConfig,
}

impl<'a, R: ContainerRuntime> ServiceLauncher<'a, R> {
    pub fn new(runtime: &'a R, stack: &'a str, health: HealthCheckConfig) -> Self {
        Self {
            runtime,
            stack,
            conflict: ConflictPolicy::default(),
            health,
        }
    }

    pub fn with_conflict_policy(mut self, conflict: ConflictPolicy) -> Self {
        self.conflict = conflict;
        self
    }

    /// サービスを起動して起動確認の結果を返す
    ///
    /// `env` はテンプレート展開済みの環境変数。
    /// 結果が `NotObserved` でもエラーにはしません（扱いは呼び出し側が決める）。
    #[instrument(skip(self, spec, env), fields(service = %spec.name))]
    pub async fn launch(
        &self,
        spec: &ServiceSpec,
        network: &str,
        env: BTreeMap<String, String>,
    ) -> Result<HealthCheckResult> {
        let request = build_run_request(self.stack, spec, network, env);

        for mount in &spec.volumes {
            prepare_host_directory(mount)?;
        }

        if self.runtime.container_exists(&request.name).await? {
            match self.conflict {
                ConflictPolicy::Replace => {
                    info!(container = %request.name, "Replacing existing container");
                    self.runtime.remove_container(&request.name).await?;
                }
                ConflictPolicy::Fail => {
                    return Err(ContainerError::NameConflict {
                        name: request.name.clone(),
                    });
                }
            }
        }

        self.runtime.run_container(&request).await?;

        wait_until_running(self.runtime, &spec.name, &request.name, &self.health).await
    }
}

/// `owner` / `mode` が指定されたホストディレクトリを用意する
pub fn prepare_host_directory(mount: &VolumeMount) -> Result<()> {
    if !mount.needs_preparation() {
        return Ok(());
    }
    let VolumeSource::HostPath(path) = &mount.source else {
        return Ok(());
    };

    let volume_err = |message: String| ContainerError::VolumePreparation {
        path: path.clone(),
        message,
    };

    fs::create_dir_all(path).map_err(|e| volume_err(e.to_string()))?;

    if let Some(mode) = mount.mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| volume_err(e.to_string()))?;
    }

    if let Some(owner) = mount.owner {
        chown(
            path.as_path(),
            Some(Uid::from_raw(owner.uid)),
            Some(Gid::from_raw(owner.gid)),
        )
        .map_err(|e| volume_err(e.to_string()))?;
    }

    debug!(path = %path.display(), mode = ?mount.mode, owner = ?mount.owner, "Prepared host directory");
    Ok(())
}
