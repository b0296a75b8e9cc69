use crate::utils;
use colored::Colorize;
use std::path::Path;

/// スタックを検証して起動順を表示（Dockerには接続しない）
pub fn handle(stack: Option<&Path>) -> anyhow::Result<()> {
    let plan = utils::load_plan(stack)?;
    utils::print_plan(&plan);

    println!();
    println!("{}", "起動ウェーブ:".bold());
    for (depth, wave) in plan.waves().iter().enumerate() {
        println!("  {}: {}", depth, wave.join(", "));
    }

    println!();
    println!("{}", "ネットワーク:".bold());
    for network in plan.networks() {
        println!("  • {}", network.cyan());
    }

    let supplied: Vec<String> = plan
        .services()
        .flat_map(|spec| {
            spec.credentials
                .iter()
                .filter(|c| c.is_supplied())
                .map(move |c| format!("{}.{}", spec.name, c.key))
        })
        .collect();
    if !supplied.is_empty() {
        println!();
        println!("{}", "入力が必要な項目:".bold());
        for item in supplied {
            println!("  • {}", item.yellow());
        }
    }

    println!();
    println!("{}", "✓ スタック定義は有効です".green().bold());
    Ok(())
}
