//! スタック定義

use super::health::HealthCheckConfig;
use super::service::ServiceSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// スタック - 1ホストにまとめて構築するサービス群
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDefinition {
    /// スタック名（コンテナ名・ラベルの接頭辞）
    pub name: String,
    /// 専用の仮想ネットワーク名
    pub network: String,
    /// 認証情報レポートの出力先
    #[serde(default)]
    pub report_path: Option<PathBuf>,
    #[serde(default)]
    pub health: HealthCheckConfig,
    /// 宣言順のサービス一覧
    pub services: Vec<ServiceSpec>,
}

impl StackDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            network: default_network_name(&name),
            name,
            report_path: None,
            health: HealthCheckConfig::default(),
            services: Vec::new(),
        }
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// サービスが所属するネットワーク
    pub fn network_for<'a>(&'a self, service: &'a ServiceSpec) -> &'a str {
        service.network.as_deref().unwrap_or(&self.network)
    }
}

/// デフォルトのネットワーク名を生成
pub fn default_network_name(stack_name: &str) -> String {
    format!("{}-net", stack_name)
}
