use crate::docker;
use crate::utils;
use colored::Colorize;
use stackpilot::{
    DeployError, DeployEvent, Deployer, EnvPrompt, RunContext, RunOptions, StdinPrompt,
    resolve_host_address,
};
use stackpilot_config::{Settings, default_report_path};
use stackpilot_container::{DockerRuntime, ResourceScope};
use stackpilot_core::{ConflictPolicy, CredentialPrompt, CredentialReport, DeploymentPlan};
use std::path::PathBuf;

pub struct UpArgs {
    pub stack: Option<PathBuf>,
    pub reset: bool,
    pub host_wide: bool,
    pub rollback: bool,
    pub on_conflict: Option<String>,
    pub report: Option<PathBuf>,
    pub host: Option<String>,
    pub non_interactive: bool,
}

pub async fn handle(args: UpArgs) -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let plan = utils::load_plan(args.stack.as_deref())?;
    utils::print_plan(&plan);

    let options = build_options(&args, &settings, &plan)?;

    println!();
    println!("ホスト: {}", options.host_address.cyan());
    println!(
        "レポート: {}",
        options.report_path.display().to_string().cyan()
    );
    if let Some(scope) = &options.reset {
        match scope {
            ResourceScope::HostWide => println!(
                "{}",
                "⚠ ホスト上のすべてのコンテナ・イメージ・ボリュームを削除します".red().bold()
            ),
            ResourceScope::Owned { stack } => {
                println!("{}", format!("♻ スタック '{}' のリソースを削除します", stack).yellow())
            }
        }
    }

    let runtime = docker::connect_docker()?;

    if args.non_interactive {
        deploy(&runtime, RunContext::new(plan, EnvPrompt, options)).await
    } else {
        println!();
        println!("{}", "必要な情報を入力してください".bold());
        deploy(&runtime, RunContext::new(plan, StdinPrompt::stdin(), options)).await
    }
}

/// CLI > 設定ファイル > スタック定義 > デフォルト の順でオプションを決める
fn build_options(
    args: &UpArgs,
    settings: &Settings,
    plan: &DeploymentPlan,
) -> anyhow::Result<RunOptions> {
    let host = resolve_host_address(args.host.as_deref().or(settings.host_address.as_deref()));

    let report_path = args
        .report
        .clone()
        .or_else(|| settings.report_path.clone())
        .or_else(|| plan.stack().report_path.clone())
        .unwrap_or_else(default_report_path);

    let conflict = match args.on_conflict.as_deref().or(settings.on_conflict.as_deref()) {
        Some(value) => ConflictPolicy::parse(value).ok_or_else(|| {
            anyhow::anyhow!(
                "on_conflict の値が不正です: '{}'（replace / fail）",
                value
            )
        })?,
        None => ConflictPolicy::default(),
    };

    let mut options = RunOptions::new(host, report_path)
        .with_conflict_policy(conflict)
        .with_rollback(args.rollback || settings.rollback_on_failure);

    if args.reset {
        options = options.with_reset(if args.host_wide {
            ResourceScope::HostWide
        } else {
            ResourceScope::owned(&plan.stack().name)
        });
    }

    Ok(options)
}

async fn deploy<P: CredentialPrompt>(
    runtime: &DockerRuntime,
    mut ctx: RunContext<P>,
) -> anyhow::Result<()> {
    let result = Deployer::new(runtime)
        .with_observer(print_event)
        .provision(&mut ctx)
        .await;

    match result {
        Ok(report) => {
            print_summary(&report, ctx.options().report_path.display().to_string());
            Ok(())
        }
        Err(e) => {
            print_failure(&e);
            Err(anyhow::anyhow!("デプロイに失敗しました"))
        }
    }
}

fn print_event(event: &DeployEvent) {
    match event {
        DeployEvent::StaleReportRemoved(path) => {
            println!("  ℹ 前回のレポートを削除しました: {}", path.display());
        }
        DeployEvent::InputCollected => {}
        DeployEvent::RuntimeReady => {
            println!();
            println!("{}", "✓ Dockerに接続しました".green());
        }
        DeployEvent::ResetFinished(summary) => {
            if summary.is_empty() {
                println!("  ℹ 削除対象のリソースはありませんでした");
            } else {
                println!(
                    "  ✓ リセット完了 (コンテナ {} / イメージ {} / ボリューム {} / ネットワーク {})",
                    summary.removed_containers,
                    summary.removed_images,
                    summary.removed_volumes,
                    summary.pruned_networks
                );
            }
        }
        DeployEvent::NetworkReady(network) => {
            println!();
            println!("{}", format!("🌐 ネットワーク: {}", network.name).blue());
            if network.created {
                println!("  ✓ ネットワーク作成完了");
            } else {
                println!("  ℹ ネットワークは既に存在します");
            }
        }
        DeployEvent::ServiceLaunching { service, image } => {
            println!();
            println!("{}", format!("▶ {} を起動中...", service).green().bold());
            println!("  → Image: {}", image.cyan());
        }
        DeployEvent::ServiceRunning { attempts, .. } => {
            println!("  ✓ 起動を確認しました ({}回目)", attempts);
        }
        DeployEvent::RolledBack { removed } => {
            println!();
            println!(
                "{}",
                format!("↩ ロールバック: {} 個のコンテナを削除しました", removed).yellow()
            );
        }
        DeployEvent::ReportWritten(path) => {
            println!();
            println!("  ✓ レポートを書き出しました: {}", path.display());
        }
    }
}

fn print_failure(e: &DeployError) {
    eprintln!();
    match e.service() {
        Some(service) => eprintln!(
            "{}",
            format!("✗ {} (サービス: {})", e.kind(), service).red().bold()
        ),
        None => eprintln!("{}", format!("✗ {}", e.kind()).red().bold()),
    }
    eprintln!();
    eprintln!("{}", e);
    eprintln!();
    eprintln!("{}", "認証情報レポートは作成されていません".yellow());
}

fn print_summary(report: &CredentialReport, report_path: String) {
    println!();
    println!("{}", "✓ すべてのサービスが起動しました！".green().bold());
    println!();
    for entry in &report.entries {
        println!("  • {} ({})", entry.display_name.bold(), entry.service);
        for address in &entry.addresses {
            println!("      {}", address.cyan());
        }
    }
    println!();
    println!("認証情報: {}", report_path.cyan());
    println!(
        "{}",
        "  ⚠ このファイルには平文のパスワードが含まれます。安全な場所に移動してください".yellow()
    );
}
