//! デプロイの実行
//!
//! 計画順に1サービスずつ起動し、すべて起動を確認できた場合のみ
//! 認証情報レポートを書き出します。途中で失敗したら即座に中断します。

use crate::context::RunContext;
use crate::error::{DeployError, Result};
use stackpilot_container::{
    CleanupOperator, CleanupSummary, ContainerError, ContainerRuntime, NetworkHandle,
    NetworkProvisioner, ServiceLauncher,
};
use stackpilot_core::{
    CredentialPrompt, CredentialReport, ReportBuilder, ReportEntry, ServiceSpec,
    discard_stale_report, expand_environment, write_report,
};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// 実行の進捗
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    /// 前回のレポートを削除した
    StaleReportRemoved(PathBuf),
    /// オペレーター入力の収集が終わった
    InputCollected,
    RuntimeReady,
    ResetFinished(CleanupSummary),
    NetworkReady(NetworkHandle),
    ServiceLaunching { service: String, image: String },
    ServiceRunning { service: String, attempts: u32 },
    /// ロールバックで削除したコンテナ数
    RolledBack { removed: usize },
    ReportWritten(PathBuf),
}

type Observer<'a> = Box<dyn FnMut(&DeployEvent) + 'a>;

/// デプロイの実行者
pub struct Deployer<'a, R> {
    runtime: &'a R,
    observer: Option<Observer<'a>>,
}

impl<'a, R: ContainerRuntime> Deployer<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self {
            runtime,
            observer: None,
        }
    }

    /// 進捗の通知先を設定
    pub fn with_observer(mut self, observer: impl FnMut(&DeployEvent) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn emit(&mut self, event: DeployEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }

    /// 実行全体
    ///
    /// 1. 前回のレポートを削除
    /// 2. オペレーター入力を収集
    /// 3. ランタイムの疎通確認
    /// 4. （指定時）環境のリセット
    /// 5. ネットワークの用意
    /// 6. 計画順にサービスを起動
    /// 7. レポートの書き出し
    ///
    /// 失敗時はレポートを残しません。`rollback_on_failure` が有効なら
    /// 今回起動したコンテナをベストエフォートで削除します。
    #[instrument(skip_all, fields(stack = %ctx.stack_name()))]
    pub async fn provision<P: CredentialPrompt>(
        &mut self,
        ctx: &mut RunContext<P>,
    ) -> Result<CredentialReport> {
        let report_path = ctx.report_path().to_path_buf();

        if discard_stale_report(&report_path).map_err(|e| DeployError::report(&report_path, e))? {
            self.emit(DeployEvent::StaleReportRemoved(report_path.clone()));
        }

        ctx.credentials.collect_operator_input()?;
        self.emit(DeployEvent::InputCollected);

        self.runtime.ping().await?;
        self.emit(DeployEvent::RuntimeReady);

        if let Some(scope) = ctx.options().reset.clone() {
            let summary = CleanupOperator::new(self.runtime)
                .reset_environment(&scope)
                .await?;
            self.emit(DeployEvent::ResetFinished(summary));
        }

        let networks: Vec<String> = ctx
            .plan()
            .networks()
            .into_iter()
            .map(str::to_string)
            .collect();
        for network in &networks {
            let handle = NetworkProvisioner::new(self.runtime, ctx.stack_name())
                .ensure_network(network)
                .await?;
            self.emit(DeployEvent::NetworkReady(handle));
        }

        let report = match self.run(ctx).await {
            Ok(report) => report,
            Err(err) => {
                if ctx.options().rollback_on_failure && !ctx.launched().is_empty() {
                    self.rollback(ctx.launched()).await;
                }
                return Err(err);
            }
        };

        write_report(&report, &report_path).map_err(|e| DeployError::report(&report_path, e))?;
        info!(path = %report_path.display(), services = report.entries.len(), "Credential report written");
        self.emit(DeployEvent::ReportWritten(report_path));

        Ok(report)
    }

    /// 計画順にサービスを起動してレポートを組み立てる
    ///
    /// サービス i は i-1 の起動を確認するまで起動しません。
    pub async fn run<P: CredentialPrompt>(
        &mut self,
        ctx: &mut RunContext<P>,
    ) -> Result<CredentialReport> {
        let services: Vec<ServiceSpec> = ctx.plan().services().cloned().collect();
        let stack = ctx.stack_name().to_string();
        let host = ctx.host().to_string();
        let launcher = ServiceLauncher::new(self.runtime, &stack, ctx.health())
            .with_conflict_policy(ctx.options().conflict);

        let mut report = ReportBuilder::new(&stack, &host);

        for spec in &services {
            ctx.credentials.resolve_service(&spec.name)?;
            let env = expand_environment(&spec.environment, &spec.name, &host, |service, key| {
                ctx.credentials.resolve(service, key)
            })?;
            let network = ctx.plan().stack().network_for(spec).to_string();

            self.emit(DeployEvent::ServiceLaunching {
                service: spec.name.clone(),
                image: spec.image_reference(),
            });

            let result = match launcher.launch(spec, &network, env).await {
                Ok(result) => {
                    ctx.record_launch(&spec.name);
                    result
                }
                Err(err) => {
                    // 既存コンテナとの競合は今回起動したものではない
                    if !matches!(err, ContainerError::NameConflict { .. }) {
                        ctx.record_launch(&spec.name);
                    }
                    return Err(DeployError::from_container(&spec.name, err));
                }
            };

            if !result.is_running() {
                warn!(service = %spec.name, attempts = result.attempts, "Service was not observed running");
                return Err(DeployError::HealthCheckTimeout {
                    service: spec.name.clone(),
                    attempts: result.attempts,
                });
            }

            report.push(ReportEntry::from_service(
                spec,
                &host,
                ctx.credentials.credentials(),
            )?);
            self.emit(DeployEvent::ServiceRunning {
                service: spec.name.clone(),
                attempts: result.attempts,
            });
        }

        Ok(report.finish())
    }

    async fn rollback(&mut self, launched: &[String]) {
        match CleanupOperator::new(self.runtime).teardown(launched).await {
            Ok(removed) => self.emit(DeployEvent::RolledBack { removed }),
            Err(e) => warn!(error = %e, "Rollback aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use stackpilot_container::testing::FakeRuntime;
    use stackpilot_core::{DeploymentPlan, HealthCheckConfig, ServiceSpec, StackDefinition};
    use std::io;

    struct NoPrompt;

    impl CredentialPrompt for NoPrompt {
        fn ask(&mut self, _: &str, _: &str, _: &str, _: bool) -> io::Result<String> {
            Ok(String::new())
        }
    }

    fn context(dir: &std::path::Path) -> RunContext<NoPrompt> {
        let mut stack = StackDefinition::new("lab");
        stack.services.push(ServiceSpec::new("db", "mariadb:11"));
        let mut app = ServiceSpec::new("app", "app:1");
        app.depends_on.push("db".to_string());
        stack.services.push(app);

        RunContext::new(
            DeploymentPlan::build(stack).unwrap(),
            NoPrompt,
            RunOptions::new("10.0.0.2", dir.join("report.txt"))
                .with_health(HealthCheckConfig::immediate(2)),
        )
    }

    #[tokio::test]
    async fn test_events_follow_run_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = FakeRuntime::new();
        let mut events = Vec::new();
        let mut ctx = context(dir.path());

        Deployer::new(&runtime)
            .with_observer(|event| events.push(event.clone()))
            .provision(&mut ctx)
            .await
            .unwrap();

        assert_eq!(events[0], DeployEvent::InputCollected);
        assert_eq!(events[1], DeployEvent::RuntimeReady);
        assert!(matches!(events[2], DeployEvent::NetworkReady(ref n) if n.name == "lab-net"));
        assert_eq!(
            events[3],
            DeployEvent::ServiceLaunching {
                service: "db".to_string(),
                image: "mariadb:11".to_string()
            }
        );
        assert!(matches!(events.last(), Some(DeployEvent::ReportWritten(_))));
    }

    #[tokio::test]
    async fn test_run_records_launched_containers() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = FakeRuntime::new().never_running("lab-app");
        let mut ctx = context(dir.path());

        let err = Deployer::new(&runtime).run(&mut ctx).await.unwrap_err();

        assert!(matches!(err, DeployError::HealthCheckTimeout { ref service, attempts: 2 } if service == "app"));
        assert_eq!(ctx.launched(), ["lab-db".to_string(), "lab-app".to_string()]);
    }
}
