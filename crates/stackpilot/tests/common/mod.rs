#![allow(dead_code)]

use stackpilot::RunOptions;
use stackpilot_core::{CredentialPrompt, DeploymentPlan, HealthCheckConfig, parse_stack_string};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use tempfile::TempDir;

/// DB と、それに依存する2つのアプリ
pub const THREE_TIER_STACK: &str = r#"
stack "lab"

service "db" {
    display "Database"
    image "mariadb:11"
    credential "root_password" generate=#true length=16
    env {
        MARIADB_ROOT_PASSWORD "{{ root_password }}"
    }
}

service "app1" {
    display "App One"
    image "wordpress:6"
    depends_on "db"
    port host=8080 container=80
    credential "admin_email" prompt="Admin email"
    env {
        DB_PASSWORD "{{ db.root_password }}"
        ADMIN_EMAIL "{{ admin_email }}"
    }
    url "http://{{ host }}:8080"
}

service "app2" {
    display "App Two"
    image "nextcloud:29"
    depends_on "db"
    port host=8081 container=80
    credential "admin_password" generate=#true
    env {
        DB_PASSWORD "{{ db.root_password }}"
        ADMIN_PASSWORD "{{ admin_password }}"
    }
}
"#;

pub fn three_tier_plan() -> DeploymentPlan {
    let stack = parse_stack_string(THREE_TIER_STACK, "lab".to_string()).unwrap();
    DeploymentPlan::build(stack).unwrap()
}

/// 決められた回答を返すプロンプト
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: HashMap<(String, String), String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, service: &str, key: &str, value: &str) -> Self {
        self.answers
            .insert((service.to_string(), key.to_string()), value.to_string());
        self
    }
}

impl CredentialPrompt for ScriptedPrompt {
    fn ask(&mut self, service: &str, key: &str, _prompt: &str, _secret: bool) -> io::Result<String> {
        self.asked.push(format!("{}.{}", service, key));
        Ok(self
            .answers
            .get(&(service.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

pub struct TestWorkspace {
    pub root: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.path().join("credentials.txt")
    }

    /// 待機なしで起動確認する実行オプション
    pub fn options(&self) -> RunOptions {
        RunOptions::new("10.0.0.2", self.report_path()).with_health(HealthCheckConfig::immediate(3))
    }

    pub fn write_stack(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("stack.kdl");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read_report(&self) -> Option<String> {
        fs::read_to_string(self.report_path()).ok()
    }
}
