use crate::error::Result;
use stackpilot_core::{Port, RestartPolicy, VolumeMount};
use std::collections::{BTreeMap, HashMap};

/// 管理対象であることを示すラベル
pub const LABEL_MANAGED: &str = "stackpilot.managed";
/// スタック名ラベル
pub const LABEL_STACK: &str = "stackpilot.stack";
/// サービス名ラベル
pub const LABEL_SERVICE: &str = "stackpilot.service";

/// スタックが所有するリソースに付けるラベル
pub fn owner_labels(stack: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert(LABEL_MANAGED.to_string(), "true".to_string());
    labels.insert(LABEL_STACK.to_string(), stack.to_string());
    labels
}

/// サービスのコンテナに付けるラベル（OrbStack / Compose のグループ化にも対応）
pub fn service_labels(stack: &str, service: &str) -> HashMap<String, String> {
    let mut labels = owner_labels(stack);
    labels.insert(LABEL_SERVICE.to_string(), service.to_string());
    labels.insert("com.docker.compose.project".to_string(), stack.to_string());
    labels.insert("com.docker.compose.service".to_string(), service.to_string());
    labels
}

/// コンテナ名を生成
pub fn container_name(stack: &str, service: &str) -> String {
    format!("{}-{}", stack, service)
}

/// コンテナランタイムのトレイト
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// ランタイムへの疎通確認
    async fn ping(&self) -> Result<()>;

    /// ネットワークを検査（存在しなければ `None`）
    async fn inspect_network(&self, name: &str) -> Result<Option<NetworkHandle>>;

    /// ネットワークを作成（同名が既にあれば `NameConflict`）
    async fn create_network(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> Result<NetworkHandle>;

    /// コンテナを作成して起動し、IDを返す
    async fn run_container(&self, request: &RunRequest) -> Result<String>;

    /// 同名のコンテナが存在するか（停止中も含む）
    async fn container_exists(&self, name: &str) -> Result<bool>;

    /// 実行中コンテナの名前一覧
    async fn list_running_containers(&self) -> Result<Vec<String>>;

    /// スコープ内のコンテナ一覧（停止中も含む）
    async fn list_containers(&self, scope: &ResourceScope) -> Result<Vec<ContainerStatus>>;

    async fn stop_container(&self, name: &str) -> Result<()>;

    /// コンテナを強制削除
    async fn remove_container(&self, name: &str) -> Result<()>;

    /// スコープ内のイメージID一覧
    async fn list_images(&self, scope: &ResourceScope) -> Result<Vec<String>>;

    async fn remove_image(&self, image: &str) -> Result<()>;

    /// スコープ内のボリューム名一覧
    async fn list_volumes(&self, scope: &ResourceScope) -> Result<Vec<String>>;

    async fn remove_volume(&self, name: &str) -> Result<()>;

    /// 未使用ネットワークを削除し、削除した名前を返す
    async fn prune_networks(&self, scope: &ResourceScope) -> Result<Vec<String>>;
}

/// 操作対象の範囲
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    /// 指定スタックのラベルが付いたリソースのみ
    Owned { stack: String },
    /// ホスト上のすべてのリソース
    HostWide,
}

impl ResourceScope {
    pub fn owned(stack: impl Into<String>) -> Self {
        Self::Owned {
            stack: stack.into(),
        }
    }

    /// Docker APIの `label` フィルタ
    pub fn label_filters(&self) -> Vec<String> {
        match self {
            Self::Owned { stack } => vec![
                format!("{}=true", LABEL_MANAGED),
                format!("{}={}", LABEL_STACK, stack),
            ],
            Self::HostWide => Vec::new(),
        }
    }

    /// Docker APIに渡すフィルタ（HostWideは空）
    pub fn filters(&self) -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        let labels = self.label_filters();
        if !labels.is_empty() {
            filters.insert("label".to_string(), labels);
        }
        filters
    }

    /// ラベルがスコープに含まれるか
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        match self {
            Self::Owned { stack } => {
                labels.get(LABEL_MANAGED).map(String::as_str) == Some("true")
                    && labels.get(LABEL_STACK) == Some(stack)
            }
            Self::HostWide => true,
        }
    }
}

/// ネットワークのハンドル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkHandle {
    pub name: String,
    pub id: String,
    /// この呼び出しで作成したか
    pub created: bool,
}

/// コンテナ起動要求
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunRequest {
    /// コンテナ名（`<stack>-<service>`）
    pub name: String,
    pub service: String,
    pub stack: String,
    /// タグ付きのイメージ参照
    pub image: String,
    pub command: Option<Vec<String>>,
    pub env: BTreeMap<String, String>,
    pub ports: Vec<Port>,
    pub mounts: Vec<VolumeMount>,
    pub network: String,
    /// ネットワーク内のエイリアス（サービス名）
    pub aliases: Vec<String>,
    pub restart: RestartPolicy,
    pub labels: HashMap<String, String>,
}

/// コンテナのステータス
#[derive(Debug, Clone)]
pub struct ContainerStatus {
    pub name: String,
    pub state: ContainerState,
    pub image: String,
    pub labels: HashMap<String, String>,
}

/// コンテナの状態
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerState {
    Running,
    Stopped,
    Paused,
    Unknown,
}

impl ContainerState {
    /// `docker ps` の STATUS 列（"Up 3 minutes" など）から判定
    pub fn from_status(status: &str) -> Self {
        if status.contains("Paused") {
            Self::Paused
        } else if status.starts_with("Up") {
            Self::Running
        } else if status.starts_with("Exited") || status.starts_with("Created") {
            Self::Stopped
        } else {
            Self::Unknown
        }
    }
}
