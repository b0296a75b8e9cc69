use colored::Colorize;
use stackpilot_config::ConfigError;
use stackpilot_core::{DeploymentPlan, StackDefinition};
use std::path::{Path, PathBuf};

/// 読み込んだスタック定義と、その出所
pub struct LoadedStack {
    pub stack: StackDefinition,
    /// None なら組み込みスタック
    pub source: Option<PathBuf>,
}

/// スタック定義を読み込む
///
/// `--stack`（または STACKPILOT_STACK）→ 探索 → 組み込みスタック の順。
pub fn load_stack(explicit: Option<&Path>) -> anyhow::Result<LoadedStack> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => match stackpilot_config::find_stack_file() {
            Ok(path) => Some(path),
            Err(ConfigError::StackFileNotFound) => None,
            Err(e) => return Err(e.into()),
        },
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading stack file");
            let stack = stackpilot_core::parse_stack_file(&path)?;
            Ok(LoadedStack {
                stack,
                source: Some(path),
            })
        }
        None => {
            tracing::debug!("No stack file found, using built-in stack");
            Ok(LoadedStack {
                stack: stackpilot_core::default_stack()?,
                source: None,
            })
        }
    }
}

/// スタックを読み込んで計画を作る
pub fn load_plan(explicit: Option<&Path>) -> anyhow::Result<DeploymentPlan> {
    let loaded = load_stack(explicit)?;
    print_loaded_stack(loaded.source.as_deref());
    Ok(DeploymentPlan::build(loaded.stack)?)
}

/// 読み込んだスタックファイルを表示
pub fn print_loaded_stack(source: Option<&Path>) {
    match source {
        Some(path) => println!("📄 スタック: {}", path.display().to_string().cyan()),
        None => println!("📄 スタック: {}", "組み込みスタック".cyan()),
    }
}

/// 起動順の一覧を表示
pub fn print_plan(plan: &DeploymentPlan) {
    println!();
    println!(
        "{}",
        format!("サービス一覧 ({} 個):", plan.len()).bold()
    );
    for (i, spec) in plan.services().enumerate() {
        if spec.depends_on.is_empty() {
            println!("  {}. {}", i + 1, spec.name.cyan());
        } else {
            println!(
                "  {}. {} {}",
                i + 1,
                spec.name.cyan(),
                format!("(depends on: {})", spec.depends_on.join(", ")).dimmed()
            );
        }
    }
}
