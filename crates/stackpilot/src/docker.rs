use colored::Colorize;
use stackpilot_container::{ContainerError, ContainerRuntime, DockerRuntime};

/// Dockerクライアントを作成（疎通確認はしない）
///
/// `up` では入力収集の後に疎通確認するため、接続だけを行います。
pub fn connect_docker() -> anyhow::Result<DockerRuntime> {
    DockerRuntime::connect().map_err(report_connection_error)
}

/// Docker接続の初期化とエラーハンドリング
pub async fn init_docker_with_error_handling() -> anyhow::Result<DockerRuntime> {
    let runtime = connect_docker()?;
    runtime.ping().await.map_err(report_connection_error)?;
    Ok(runtime)
}

fn report_connection_error(e: ContainerError) -> anyhow::Error {
    eprintln!();
    eprintln!("{}", "✗ Docker接続エラー".red().bold());
    eprintln!();
    eprintln!("{}", "原因:".yellow());
    eprintln!("  {}", e.to_string().lines().next().unwrap_or_default());
    print_connection_hints();
    anyhow::anyhow!("Docker接続に失敗しました")
}

pub fn print_connection_hints() {
    eprintln!();
    eprintln!("{}", "解決方法:".yellow());
    eprintln!("  • Dockerが起動しているか確認してください");
    eprintln!("  • 実行ユーザーが docker グループに所属しているか確認してください");
    eprintln!("  • docker ps コマンドが正常に動作するか確認してください");
}
