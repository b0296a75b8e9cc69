use crate::docker;
use crate::utils;
use colored::Colorize;
use stackpilot_container::{CleanupOperator, ResourceScope};
use std::io::{self, BufRead, Write};
use std::path::Path;

pub async fn handle(stack: Option<&Path>, host_wide: bool, yes: bool) -> anyhow::Result<()> {
    let loaded = utils::load_stack(stack)?;
    utils::print_loaded_stack(loaded.source.as_deref());

    let scope = if host_wide {
        ResourceScope::HostWide
    } else {
        ResourceScope::owned(&loaded.stack.name)
    };

    println!();
    match &scope {
        ResourceScope::HostWide => println!(
            "{}",
            "⚠ ホスト上のすべてのコンテナ・イメージ・ボリュームを削除します".red().bold()
        ),
        ResourceScope::Owned { stack } => println!(
            "{}",
            format!("♻ スタック '{}' のリソースを削除します", stack).yellow()
        ),
    }

    if !yes && !confirm()? {
        println!("中止しました");
        return Ok(());
    }

    println!();
    println!("{}", "Dockerに接続中...".blue());
    let runtime = docker::init_docker_with_error_handling().await?;

    let summary = CleanupOperator::new(&runtime)
        .reset_environment(&scope)
        .await?;

    println!();
    if summary.is_empty() {
        println!("{}", "ℹ 削除対象のリソースはありませんでした".cyan());
    } else {
        println!("{}", "✓ リセット完了".green().bold());
        println!("  • 停止したコンテナ: {}", summary.stopped_containers);
        println!("  • 削除したコンテナ: {}", summary.removed_containers);
        println!("  • 削除したイメージ: {}", summary.removed_images);
        println!("  • 削除したボリューム: {}", summary.removed_volumes);
        println!("  • 削除したネットワーク: {}", summary.pruned_networks);
    }
    Ok(())
}

fn confirm() -> anyhow::Result<bool> {
    print!("続行しますか？ [y/N]: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
