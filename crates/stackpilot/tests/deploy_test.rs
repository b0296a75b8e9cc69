mod common;

use common::{ScriptedPrompt, TestWorkspace, three_tier_plan};
use stackpilot::{DeployError, Deployer, RunContext};
use stackpilot_container::testing::FakeRuntime;
use stackpilot_container::{ResourceScope, service_labels};
use stackpilot_core::{ConflictPolicy, DeploymentPlan, parse_stack_string};
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;

fn prompt() -> ScriptedPrompt {
    ScriptedPrompt::new().answer("app1", "admin_email", "admin@example.com")
}

fn position(calls: &[String], call: &str) -> usize {
    calls
        .iter()
        .position(|c| c == call)
        .unwrap_or_else(|| panic!("call not found: {}", call))
}

/// すべて起動できればレポートが揃い、権限は 0600
#[tokio::test]
async fn test_full_run_writes_complete_report() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new();
    let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());

    let report = Deployer::new(&runtime).provision(&mut ctx).await.unwrap();

    assert_eq!(
        runtime.started_containers(),
        vec!["lab-db", "lab-app1", "lab-app2"]
    );
    let services: Vec<&str> = report.entries.iter().map(|e| e.service.as_str()).collect();
    assert_eq!(services, vec!["db", "app1", "app2"]);

    let app1 = report.entry("app1").unwrap();
    assert_eq!(app1.display_name, "App One");
    assert_eq!(app1.addresses, vec!["http://10.0.0.2:8080"]);
    assert_eq!(app1.credentials["admin_email"], "admin@example.com");
    assert_eq!(report.entry("app2").unwrap().addresses, vec!["10.0.0.2:8081"]);
    assert_eq!(report.entry("db").unwrap().addresses, vec!["db"]);

    let text = workspace.read_report().unwrap();
    assert!(text.contains("# stack:     lab"));
    assert!(text.contains("[Database] (db)"));
    assert!(text.contains("[App One] (app1)"));
    assert!(text.contains("[App Two] (app2)"));

    let mode = fs::metadata(workspace.report_path())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

/// 生成した値は、それを参照するすべての場所で同じ
#[tokio::test]
async fn test_generated_credential_is_consistent() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new();
    let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());

    let report = Deployer::new(&runtime).provision(&mut ctx).await.unwrap();

    let password = report.entry("db").unwrap().credentials["root_password"].clone();
    assert_eq!(password.len(), 16);
    assert_eq!(
        runtime.container("lab-db").unwrap().env["MARIADB_ROOT_PASSWORD"],
        password
    );
    assert_eq!(runtime.container("lab-app1").unwrap().env["DB_PASSWORD"], password);
    assert_eq!(runtime.container("lab-app2").unwrap().env["DB_PASSWORD"], password);
    assert!(workspace.read_report().unwrap().contains(&password));
}

/// 入力は実行ごとに一度だけ、コンテナ操作の前に求められる
#[tokio::test]
async fn test_operator_input_is_asked_once() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new();
    let mut prompt = prompt();

    {
        let mut ctx = RunContext::new(three_tier_plan(), &mut prompt, workspace.options());
        Deployer::new(&runtime).provision(&mut ctx).await.unwrap();
    }

    assert_eq!(prompt.asked, vec!["app1.admin_email"]);
    assert_eq!(
        runtime.container("lab-app1").unwrap().env["ADMIN_EMAIL"],
        "admin@example.com"
    );
}

/// DB → App1 → App2 で App2 が起動しない場合
#[tokio::test]
async fn test_unobserved_service_aborts_without_report() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new().never_running("lab-app2");
    let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());

    let err = Deployer::new(&runtime)
        .provision(&mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::HealthCheckTimeout { ref service, attempts: 3 } if service == "app2"
    ));
    assert!(workspace.read_report().is_none());

    // ロールバックは既定で行わない
    assert!(runtime.container("lab-db").is_some());
    assert!(runtime.container("lab-app1").is_some());
}

/// 前のサービスの起動を確認するまで次を起動しない
#[tokio::test]
async fn test_next_service_waits_for_previous() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new().running_after("lab-db", 2);
    let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());

    Deployer::new(&runtime).provision(&mut ctx).await.unwrap();

    let calls = runtime.calls();
    let db_started = position(&calls, "run_container:lab-db");
    let app1_started = position(&calls, "run_container:lab-app1");
    let polls_before_app1 = calls[db_started..app1_started]
        .iter()
        .filter(|c| *c == "list_running_containers")
        .count();
    assert_eq!(polls_before_app1, 3);
}

/// 空入力はランタイムに触れる前に中断する
#[tokio::test]
async fn test_blank_input_aborts_before_runtime() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new();
    let mut ctx = RunContext::new(three_tier_plan(), ScriptedPrompt::new(), workspace.options());

    let err = Deployer::new(&runtime)
        .provision(&mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Input(_)));
    assert!(runtime.calls().is_empty());
    assert!(workspace.read_report().is_none());
}

#[tokio::test]
async fn test_unavailable_runtime_aborts() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new().unavailable();
    let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());

    let err = Deployer::new(&runtime)
        .provision(&mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::RuntimeUnavailable(_)));
    assert_eq!(runtime.calls(), vec!["ping"]);
    assert!(runtime.started_containers().is_empty());
}

/// 失敗した実行は前回のレポートを残さない
#[tokio::test]
async fn test_stale_report_is_discarded_on_failure() {
    let workspace = TestWorkspace::new();
    fs::write(workspace.report_path(), "old credentials").unwrap();
    let runtime = FakeRuntime::new().unavailable();
    let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());

    Deployer::new(&runtime)
        .provision(&mut ctx)
        .await
        .unwrap_err();

    assert!(workspace.read_report().is_none());
}

#[tokio::test]
async fn test_rollback_removes_launched_containers() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new().never_running("lab-app2");
    let mut ctx = RunContext::new(
        three_tier_plan(),
        prompt(),
        workspace.options().with_rollback(true),
    );

    let err = Deployer::new(&runtime)
        .provision(&mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::HealthCheckTimeout { .. }));
    assert!(runtime.container_names().is_empty());

    let calls = runtime.calls();
    assert!(
        position(&calls, "remove_container:lab-app2")
            < position(&calls, "remove_container:lab-db")
    );
}

/// 競合で拒否した既存コンテナはロールバックでも削除しない
#[tokio::test]
async fn test_conflict_policy_fail_keeps_existing_container() {
    let workspace = TestWorkspace::new();
    let runtime =
        FakeRuntime::new().with_container("lab-db", "mariadb:10", HashMap::new(), true);
    let mut ctx = RunContext::new(
        three_tier_plan(),
        prompt(),
        workspace
            .options()
            .with_conflict_policy(ConflictPolicy::Fail)
            .with_rollback(true),
    );

    let err = Deployer::new(&runtime)
        .provision(&mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::NameConflict { ref service, ref name } if service == "db" && name == "lab-db"
    ));
    assert_eq!(err.service(), Some("db"));
    assert_eq!(runtime.container("lab-db").unwrap().image, "mariadb:10");
    assert!(runtime.started_containers().is_empty());
}

#[tokio::test]
async fn test_existing_container_is_replaced_by_default() {
    let workspace = TestWorkspace::new();
    let runtime =
        FakeRuntime::new().with_container("lab-db", "mariadb:10", HashMap::new(), true);
    let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());

    Deployer::new(&runtime).provision(&mut ctx).await.unwrap();

    assert_eq!(runtime.container("lab-db").unwrap().image, "mariadb:11");
}

/// リセットはスタックのラベルが付いたリソースだけを削除する
#[tokio::test]
async fn test_reset_is_scoped_to_stack() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new()
        .with_container("lab-old", "old:1", service_labels("lab", "old"), true)
        .with_container("someone-else", "nginx:1", HashMap::new(), true);
    let mut ctx = RunContext::new(
        three_tier_plan(),
        prompt(),
        workspace.options().with_reset(ResourceScope::owned("lab")),
    );

    Deployer::new(&runtime).provision(&mut ctx).await.unwrap();

    assert!(runtime.container("lab-old").is_none());
    assert!(runtime.container("someone-else").is_some());
    assert!(runtime.has_image("nginx:1"));
    assert!(!runtime.has_image("old:1"));
}

/// 既存ネットワークを再利用し、二度目の実行でも増えない
#[tokio::test]
async fn test_network_is_created_once() {
    let workspace = TestWorkspace::new();
    let runtime = FakeRuntime::new();

    for _ in 0..2 {
        let mut ctx = RunContext::new(three_tier_plan(), prompt(), workspace.options());
        Deployer::new(&runtime).provision(&mut ctx).await.unwrap();
    }

    assert_eq!(runtime.network_count("lab-net"), 1);
    assert_eq!(
        runtime
            .calls()
            .iter()
            .filter(|c| *c == "create_network:lab-net")
            .count(),
        1
    );
}

/// 未定義の認証情報を参照するとそのサービスの起動前に中断する
#[tokio::test]
async fn test_undeclared_reference_is_missing_credential() {
    let workspace = TestWorkspace::new();
    let stack = parse_stack_string(
        r#"
stack "lab"
service "db" {
    image "mariadb:11"
    credential "root_password" generate=#true
}
service "app" {
    image "app:1"
    depends_on "db"
    env {
        DB_USER "{{ db.user }}"
    }
}
"#,
        "lab".to_string(),
    )
    .unwrap();
    let runtime = FakeRuntime::new();
    let mut ctx = RunContext::new(
        DeploymentPlan::build(stack).unwrap(),
        ScriptedPrompt::new(),
        workspace.options(),
    );

    let err = Deployer::new(&runtime)
        .provision(&mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::MissingCredential { ref service, ref key } if service == "db" && key == "user"
    ));
    assert_eq!(runtime.started_containers(), vec!["lab-db"]);
    assert!(workspace.read_report().is_none());
}
