//! テスト用のインメモリランタイム
//!
//! `test-utils` フィーチャーで公開されます。呼び出し履歴を記録し、
//! 接続不能や起動しないコンテナなどの失敗を再現できます。

use crate::error::{ContainerError, Result};
use crate::runtime::{
    ContainerRuntime, ContainerState, ContainerStatus, NetworkHandle, ResourceScope, RunRequest,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// FakeRuntime 上のコンテナ
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub name: String,
    pub image: String,
    pub labels: HashMap<String, String>,
    pub env: BTreeMap<String, String>,
    pub network: String,
    pub running: bool,
}

#[derive(Debug, Clone)]
struct FakeNetwork {
    name: String,
    id: String,
    labels: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    unavailable: bool,
    networks: Vec<FakeNetwork>,
    containers: Vec<FakeContainer>,
    images: Vec<(String, HashMap<String, String>)>,
    volumes: Vec<(String, HashMap<String, String>)>,
    calls: Vec<String>,
    started: Vec<String>,
    never_running: HashSet<String>,
    running_after: HashMap<String, u32>,
    racing_networks: HashSet<String>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    fn add_image(&mut self, id: &str, labels: HashMap<String, String>) {
        if !self.images.iter().any(|(i, _)| i == id) {
            self.images.push((id.to_string(), labels));
        }
    }
}

/// インメモリの ContainerRuntime 実装
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 呼び出しを記録し、接続不能なら RuntimeUnavailable を返す
    fn record(&self, call: String) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(call);
        if state.unavailable {
            return Err(ContainerError::RuntimeUnavailable(
                "fake runtime is unavailable".to_string(),
            ));
        }
        Ok(state)
    }

    /// すべての呼び出しを RuntimeUnavailable にする
    pub fn unavailable(self) -> Self {
        self.set_unavailable(true);
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn with_container(
        self,
        name: &str,
        image: &str,
        labels: HashMap<String, String>,
        running: bool,
    ) -> Self {
        {
            let mut state = self.state();
            state.add_image(image, HashMap::new());
            state.containers.push(FakeContainer {
                name: name.to_string(),
                image: image.to_string(),
                labels,
                env: BTreeMap::new(),
                network: String::new(),
                running,
            });
        }
        self
    }

    pub fn with_image(self, id: &str) -> Self {
        self.state().add_image(id, HashMap::new());
        self
    }

    pub fn with_volume(self, name: &str, labels: HashMap<String, String>) -> Self {
        self.state().volumes.push((name.to_string(), labels));
        self
    }

    pub fn with_network(self, name: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.next_id("net");
            state.networks.push(FakeNetwork {
                name: name.to_string(),
                id,
                labels: HashMap::new(),
            });
        }
        self
    }

    /// このコンテナは起動しても実行中にならない
    pub fn never_running(self, container: &str) -> Self {
        self.state().never_running.insert(container.to_string());
        self
    }

    /// 実行中一覧に `polls` 回分は現れない
    pub fn running_after(self, container: &str, polls: u32) -> Self {
        self.state()
            .running_after
            .insert(container.to_string(), polls);
        self
    }

    /// 検査と作成の間に別の作成者がネットワークを作った状況を再現
    pub fn race_network_creation(self, name: &str) -> Self {
        self.state().racing_networks.insert(name.to_string());
        self
    }

    /// 呼び出し履歴（`run_container:homelab-db` 形式）
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// run_container で起動したコンテナ名（起動順）
    pub fn started_containers(&self) -> Vec<String> {
        self.state().started.clone()
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.state()
            .containers
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.state()
            .containers
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn network_count(&self, name: &str) -> usize {
        self.state()
            .networks
            .iter()
            .filter(|n| n.name == name)
            .count()
    }

    pub fn has_image(&self, id: &str) -> bool {
        self.state().images.iter().any(|(i, _)| i == id)
    }

    pub fn has_volume(&self, name: &str) -> bool {
        self.state().volumes.iter().any(|(v, _)| v == name)
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<()> {
        self.record("ping".to_string())?;
        Ok(())
    }

    async fn inspect_network(&self, name: &str) -> Result<Option<NetworkHandle>> {
        let state = self.record(format!("inspect_network:{}", name))?;
        if state.racing_networks.contains(name) {
            return Ok(None);
        }
        Ok(state
            .networks
            .iter()
            .find(|n| n.name == name)
            .map(|n| NetworkHandle {
                name: n.name.clone(),
                id: n.id.clone(),
                created: false,
            }))
    }

    async fn create_network(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> Result<NetworkHandle> {
        let mut state = self.record(format!("create_network:{}", name))?;

        if state.racing_networks.remove(name) {
            // 別の作成者が先に作成した
            let id = state.next_id("net");
            state.networks.push(FakeNetwork {
                name: name.to_string(),
                id,
                labels: HashMap::new(),
            });
        }

        if state.networks.iter().any(|n| n.name == name) {
            return Err(ContainerError::NameConflict {
                name: name.to_string(),
            });
        }

        let id = state.next_id("net");
        state.networks.push(FakeNetwork {
            name: name.to_string(),
            id: id.clone(),
            labels: labels.clone(),
        });
        Ok(NetworkHandle {
            name: name.to_string(),
            id,
            created: true,
        })
    }

    async fn run_container(&self, request: &RunRequest) -> Result<String> {
        let mut state = self.record(format!("run_container:{}", request.name))?;

        if state.containers.iter().any(|c| c.name == request.name) {
            return Err(ContainerError::NameConflict {
                name: request.name.clone(),
            });
        }

        let running = !state.never_running.contains(&request.name);
        state.add_image(&request.image, HashMap::new());
        state.containers.push(FakeContainer {
            name: request.name.clone(),
            image: request.image.clone(),
            labels: request.labels.clone(),
            env: request.env.clone(),
            network: request.network.clone(),
            running,
        });
        state.started.push(request.name.clone());
        Ok(state.next_id("ctr"))
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        let state = self.record(format!("container_exists:{}", name))?;
        Ok(state.containers.iter().any(|c| c.name == name))
    }

    async fn list_running_containers(&self) -> Result<Vec<String>> {
        let mut state = self.record("list_running_containers".to_string())?;
        let mut running = Vec::new();
        let names: Vec<String> = state
            .containers
            .iter()
            .filter(|c| c.running)
            .map(|c| c.name.clone())
            .collect();
        for name in names {
            match state.running_after.get_mut(&name) {
                Some(remaining) if *remaining > 0 => *remaining -= 1,
                _ => running.push(name),
            }
        }
        Ok(running)
    }

    async fn list_containers(&self, scope: &ResourceScope) -> Result<Vec<ContainerStatus>> {
        let state = self.record("list_containers".to_string())?;
        Ok(state
            .containers
            .iter()
            .filter(|c| scope.matches(&c.labels))
            .map(|c| ContainerStatus {
                name: c.name.clone(),
                state: if c.running {
                    ContainerState::Running
                } else {
                    ContainerState::Stopped
                },
                image: c.image.clone(),
                labels: c.labels.clone(),
            })
            .collect())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        let mut state = self.record(format!("stop_container:{}", name))?;
        let container = state
            .containers
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ContainerError::NotFound {
                resource: name.to_string(),
            })?;
        container.running = false;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        let mut state = self.record(format!("remove_container:{}", name))?;
        let before = state.containers.len();
        state.containers.retain(|c| c.name != name);
        if state.containers.len() == before {
            return Err(ContainerError::NotFound {
                resource: name.to_string(),
            });
        }
        Ok(())
    }

    async fn list_images(&self, scope: &ResourceScope) -> Result<Vec<String>> {
        let state = self.record("list_images".to_string())?;
        Ok(state
            .images
            .iter()
            .filter(|(_, labels)| scope.matches(labels))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        let mut state = self.record(format!("remove_image:{}", image))?;
        let before = state.images.len();
        state.images.retain(|(id, _)| id != image);
        if state.images.len() == before {
            return Err(ContainerError::ImageNotFound {
                image: image.to_string(),
            });
        }
        Ok(())
    }

    async fn list_volumes(&self, scope: &ResourceScope) -> Result<Vec<String>> {
        let state = self.record("list_volumes".to_string())?;
        Ok(state
            .volumes
            .iter()
            .filter(|(_, labels)| scope.matches(labels))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        let mut state = self.record(format!("remove_volume:{}", name))?;
        let before = state.volumes.len();
        state.volumes.retain(|(v, _)| v != name);
        if state.volumes.len() == before {
            return Err(ContainerError::NotFound {
                resource: name.to_string(),
            });
        }
        Ok(())
    }

    async fn prune_networks(&self, scope: &ResourceScope) -> Result<Vec<String>> {
        let mut state = self.record("prune_networks".to_string())?;
        let in_use: HashSet<String> = state
            .containers
            .iter()
            .map(|c| c.network.clone())
            .collect();
        let (pruned, kept): (Vec<FakeNetwork>, Vec<FakeNetwork>) = std::mem::take(&mut state.networks)
            .into_iter()
            .partition(|n| scope.matches(&n.labels) && !in_use.contains(&n.name));
        state.networks = kept;
        Ok(pruned.into_iter().map(|n| n.name).collect())
    }
}
