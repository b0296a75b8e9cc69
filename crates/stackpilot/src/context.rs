//! 実行コンテキスト
//!
//! 1回の `up` 実行に必要な状態（計画・認証情報・オプション・起動済みコンテナ）を
//! まとめて持ち回ります。グローバルな状態は持ちません。

use stackpilot_container::{ResourceScope, container_name};
use stackpilot_core::{
    ConflictPolicy, CredentialManager, CredentialPrompt, DeploymentPlan, HealthCheckConfig,
};
use std::path::{Path, PathBuf};

/// 実行オプション
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// レポートとURLに使うホストアドレス
    pub host_address: String,
    /// 認証情報レポートの出力先
    pub report_path: PathBuf,
    /// 起動前にリセットする範囲（None ならリセットしない）
    pub reset: Option<ResourceScope>,
    pub conflict: ConflictPolicy,
    /// 失敗時に今回起動したコンテナを削除する
    pub rollback_on_failure: bool,
    /// 起動確認の設定（None ならスタック定義の値）
    pub health: Option<HealthCheckConfig>,
}

impl RunOptions {
    pub fn new(host_address: impl Into<String>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            host_address: host_address.into(),
            report_path: report_path.into(),
            reset: None,
            conflict: ConflictPolicy::default(),
            rollback_on_failure: false,
            health: None,
        }
    }

    pub fn with_reset(mut self, scope: ResourceScope) -> Self {
        self.reset = Some(scope);
        self
    }

    pub fn with_conflict_policy(mut self, conflict: ConflictPolicy) -> Self {
        self.conflict = conflict;
        self
    }

    pub fn with_rollback(mut self, rollback_on_failure: bool) -> Self {
        self.rollback_on_failure = rollback_on_failure;
        self
    }

    pub fn with_health(mut self, health: HealthCheckConfig) -> Self {
        self.health = Some(health);
        self
    }
}

/// 1回の実行の状態
pub struct RunContext<P> {
    plan: DeploymentPlan,
    pub(crate) credentials: CredentialManager<P>,
    options: RunOptions,
    /// 今回起動したコンテナ名（起動順）
    pub(crate) launched: Vec<String>,
}

impl<P: CredentialPrompt> RunContext<P> {
    pub fn new(plan: DeploymentPlan, prompt: P, options: RunOptions) -> Self {
        let credentials = CredentialManager::new(&plan, prompt);
        Self {
            plan,
            credentials,
            options,
            launched: Vec::new(),
        }
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn stack_name(&self) -> &str {
        &self.plan.stack().name
    }

    pub fn host(&self) -> &str {
        &self.options.host_address
    }

    pub fn report_path(&self) -> &Path {
        &self.options.report_path
    }

    /// 実際に使う起動確認の設定
    pub fn health(&self) -> HealthCheckConfig {
        self.options.health.unwrap_or(self.plan.stack().health)
    }

    pub fn launched(&self) -> &[String] {
        &self.launched
    }

    pub fn credentials(&self) -> &CredentialManager<P> {
        &self.credentials
    }

    pub(crate) fn record_launch(&mut self, service: &str) {
        let name = container_name(&self.plan.stack().name, service);
        if !self.launched.contains(&name) {
            self.launched.push(name);
        }
    }
}
