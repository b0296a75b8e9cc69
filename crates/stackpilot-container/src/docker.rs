//! Docker (bollard) によるランタイム実装

// Bollard 0.19 の非推奨APIを使用
#![allow(deprecated)]

use crate::converter::{named_volumes, run_request_to_container_config};
use crate::error::{ContainerError, Result};
use crate::runtime::{
    ContainerRuntime, ContainerState, ContainerStatus, NetworkHandle, ResourceScope, RunRequest,
    owner_labels,
};
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::errors::Error as BollardError;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Docker Engine API を使うランタイム
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// ローカルのDockerに接続（疎通確認は `ping` で行う）
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ContainerError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    pub fn client(&self) -> &Docker {
        &self.docker
    }

    /// イメージをダウンロード
    #[instrument(skip(self))]
    async fn pull_image(&self, image: &str) -> Result<()> {
        let (image_name, tag) = parse_image_tag(image);
        info!(image, "Pulling image");

        // レジストリから認証情報を取得（あれば）
        let credentials = extract_registry(image).and_then(get_docker_credentials);

        let options = bollard::image::CreateImageOptions {
            from_image: image_name,
            tag,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, credentials);
        while let Some(info) = stream.next().await {
            match info {
                Ok(bollard::models::CreateImageInfo {
                    status: Some(status),
                    progress,
                    ..
                }) => {
                    debug!(
                        image,
                        status = %status,
                        progress = progress.as_deref().unwrap_or(""),
                        "Pull progress"
                    );
                }
                Ok(_) => {}
                Err(BollardError::DockerResponseServerError {
                    status_code: 404, ..
                }) => {
                    return Err(ContainerError::ImageNotFound {
                        image: image.to_string(),
                    });
                }
                Err(e) => {
                    let err = ContainerError::from(e);
                    if err.is_unavailable() {
                        return Err(err);
                    }
                    return Err(ContainerError::ImagePull {
                        image: image.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(image, "Pulled image");
        Ok(())
    }

    /// 名前付きボリュームをオーナーラベル付きで作成
    async fn ensure_volume(&self, name: &str, stack: &str) -> Result<()> {
        let options = bollard::volume::CreateVolumeOptions {
            name: name.to_string(),
            labels: owner_labels(stack),
            ..Default::default()
        };
        self.docker.create_volume(options).await?;
        debug!(volume = name, "Ensured named volume");
        Ok(())
    }

    async fn create_and_start(&self, request: &RunRequest) -> Result<String> {
        let (config, options) = run_request_to_container_config(request);

        let response = match self
            .docker
            .create_container(Some(options.clone()), config.clone())
            .await
        {
            Ok(response) => response,
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                // イメージが見つからない場合はpullして再試行
                self.pull_image(&request.image).await?;
                self.docker
                    .create_container(Some(options), config)
                    .await
                    .map_err(|e| conflict_or(e, &request.name))?
            }
            Err(e) => return Err(conflict_or(e, &request.name)),
        };

        self.docker
            .start_container(
                &response.id,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await?;

        Ok(response.id)
    }
}

/// 409 を NameConflict に変換
fn conflict_or(err: BollardError, name: &str) -> ContainerError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 409, ..
        } => ContainerError::NameConflict {
            name: name.to_string(),
        },
        other => other.into(),
    }
}

impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| ContainerError::RuntimeUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn inspect_network(&self, name: &str) -> Result<Option<NetworkHandle>> {
        match self
            .docker
            .inspect_network(
                name,
                None::<bollard::query_parameters::InspectNetworkOptions>,
            )
            .await
        {
            Ok(network) => Ok(Some(NetworkHandle {
                name: network.name.unwrap_or_else(|| name.to_string()),
                id: network.id.unwrap_or_default(),
                created: false,
            })),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_network(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> Result<NetworkHandle> {
        let config = bollard::models::NetworkCreateRequest {
            name: name.to_string(),
            driver: Some("bridge".to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        };

        let response = self
            .docker
            .create_network(config)
            .await
            .map_err(|e| conflict_or(e, name))?;

        Ok(NetworkHandle {
            name: name.to_string(),
            id: response.id,
            created: true,
        })
    }

    #[instrument(skip(self, request), fields(container = %request.name))]
    async fn run_container(&self, request: &RunRequest) -> Result<String> {
        for volume in named_volumes(request) {
            self.ensure_volume(volume, &request.stack).await?;
        }

        let id = self.create_and_start(request).await?;
        info!(id = %id, image = %request.image, "Started container");
        Ok(id)
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        match self
            .docker
            .inspect_container(
                name,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
        {
            Ok(_) => Ok(true),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_running_containers(&self) -> Result<Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert("status".to_string(), vec!["running".to_string()]);

        let options = bollard::container::ListContainersOptions {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers
            .iter()
            .flat_map(|c| c.names.iter().flatten())
            .map(|n| n.trim_start_matches('/').to_string())
            .collect())
    }

    async fn list_containers(&self, scope: &ResourceScope) -> Result<Vec<ContainerStatus>> {
        let options = bollard::container::ListContainersOptions {
            all: true,
            filters: scope.filters(),
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers
            .into_iter()
            .map(|c| ContainerStatus {
                name: c
                    .names
                    .as_ref()
                    .and_then(|n| n.first())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .or(c.id.clone())
                    .unwrap_or_default(),
                state: ContainerState::from_status(c.status.as_deref().unwrap_or_default()),
                image: c.image.unwrap_or_default(),
                labels: c.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        match self
            .docker
            .stop_container(
                name,
                None::<bollard::query_parameters::StopContainerOptions>,
            )
            .await
        {
            Ok(_) => Ok(()),
            // 既に停止している
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        self.docker
            .remove_container(
                name,
                Some(bollard::query_parameters::RemoveContainerOptions {
                    force: true,
                    v: false,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn list_images(&self, scope: &ResourceScope) -> Result<Vec<String>> {
        let options = bollard::image::ListImagesOptions::<String> {
            all: false,
            filters: scope.filters(),
            ..Default::default()
        };

        let images = self.docker.list_images(Some(options)).await?;
        Ok(images.into_iter().map(|i| i.id).collect())
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        let options = bollard::image::RemoveImageOptions {
            force: true,
            ..Default::default()
        };
        self.docker.remove_image(image, Some(options), None).await?;
        Ok(())
    }

    async fn list_volumes(&self, scope: &ResourceScope) -> Result<Vec<String>> {
        let options = bollard::volume::ListVolumesOptions {
            filters: scope.filters(),
        };

        let response = self.docker.list_volumes(Some(options)).await?;
        if let Some(warnings) = response.warnings {
            for warning in warnings {
                warn!(warning = %warning, "Volume list warning");
            }
        }
        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|v| v.name)
            .collect())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        self.docker
            .remove_volume(
                name,
                Some(bollard::volume::RemoveVolumeOptions { force: true }),
            )
            .await?;
        Ok(())
    }

    async fn prune_networks(&self, scope: &ResourceScope) -> Result<Vec<String>> {
        let options = bollard::network::PruneNetworksOptions {
            filters: scope.filters(),
        };

        let response = self.docker.prune_networks(Some(options)).await?;
        Ok(response.networks_deleted.unwrap_or_default())
    }
}

/// Docker config.json からレジストリの認証情報を取得
pub fn get_docker_credentials(registry: &str) -> Option<DockerCredentials> {
    let config_path = dirs::home_dir()?.join(".docker").join("config.json");
    let config_content = std::fs::read_to_string(&config_path).ok()?;
    let config: serde_json::Value = serde_json::from_str(&config_content).ok()?;

    let auths = config.get("auths")?.as_object()?;
    let auth_entry = auths.get(registry)?;
    let auth_b64 = auth_entry.get("auth")?.as_str()?;

    // Base64 デコード (username:password 形式)
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64)
        .ok()?;
    let auth_str = String::from_utf8(decoded).ok()?;
    let (username, password) = auth_str.split_once(':')?;

    Some(DockerCredentials {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    })
}

/// イメージ名からレジストリを抽出
///
/// 最初の `/` の前が `.` か `:` を含む場合のみレジストリとみなす（ghcr.io, localhost:5000）
pub fn extract_registry(image: &str) -> Option<&str> {
    let (first, _) = image.split_once('/')?;
    if first.contains('.') || first.contains(':') {
        Some(first)
    } else {
        None
    }
}

/// イメージ名とタグを分離
///
/// 例: "redis:7-alpine" -> ("redis", "7-alpine")
///     "localhost:5000/app" -> ("localhost:5000/app", "latest")
pub fn parse_image_tag(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}
