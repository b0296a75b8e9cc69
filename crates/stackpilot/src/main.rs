mod commands;
mod docker;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackpilot")]
#[command(about = "セルフホスト環境を、ひとつのコマンドで。", long_about = None)]
struct Cli {
    /// 詳細なログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// スタックを構築し、認証情報レポートを書き出す
    Up {
        /// スタックファイル（省略時は探索、見つからなければ組み込みスタック）
        #[arg(short, long, env = "STACKPILOT_STACK")]
        stack: Option<PathBuf>,
        /// 構築前に管理対象のリソースを削除する
        #[arg(long)]
        reset: bool,
        /// リセット対象をホスト上のすべてのリソースに広げる
        #[arg(long, requires = "reset")]
        host_wide: bool,
        /// 失敗時に今回起動したコンテナを削除する
        #[arg(long)]
        rollback: bool,
        /// 同名コンテナがある場合の扱い
        #[arg(long, value_parser = ["replace", "fail"])]
        on_conflict: Option<String>,
        /// 認証情報レポートの出力先
        #[arg(long)]
        report: Option<PathBuf>,
        /// レポートとURLに使うホストアドレス
        #[arg(long)]
        host: Option<String>,
        /// 入力を環境変数 STACKPILOT_<SERVICE>_<KEY> から読む
        #[arg(long)]
        non_interactive: bool,
    },
    /// 管理対象のコンテナ・イメージ・ボリューム・ネットワークを削除
    Reset {
        /// スタックファイル（省略時は探索、見つからなければ組み込みスタック）
        #[arg(short, long, env = "STACKPILOT_STACK")]
        stack: Option<PathBuf>,
        /// ホスト上のすべてのリソースを削除する
        #[arg(long)]
        host_wide: bool,
        /// 確認をスキップ
        #[arg(short, long)]
        yes: bool,
    },
    /// スタックを検証し、起動順を表示
    Plan {
        /// スタックファイル（省略時は探索、見つからなければ組み込みスタック）
        #[arg(short, long, env = "STACKPILOT_STACK")]
        stack: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("stackpilot {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Plan { stack } => commands::plan::handle(stack.as_deref()),
        Commands::Reset {
            stack,
            host_wide,
            yes,
        } => commands::reset::handle(stack.as_deref(), host_wide, yes).await,
        Commands::Up {
            stack,
            reset,
            host_wide,
            rollback,
            on_conflict,
            report,
            host,
            non_interactive,
        } => {
            commands::up::handle(commands::up::UpArgs {
                stack,
                reset,
                host_wide,
                rollback,
                on_conflict,
                report,
                host,
                non_interactive,
            })
            .await
        }
    }
}
