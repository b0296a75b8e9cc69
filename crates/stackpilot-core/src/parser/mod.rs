//! KDLパーサー
//!
//! スタック定義ファイル（stack.kdl）をパースします。
//! 各ノードタイプのパース処理はモジュールに分離されています。

mod port;
mod service;
mod volume;

use service::parse_service;

use crate::error::{Result, StackError};
use crate::model::{HealthCheckConfig, ServiceSpec, StackDefinition};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// KDLファイルをパースしてStackDefinitionを生成
///
/// `stack` ノードがない場合、ファイルのあるディレクトリ名をスタック名に使います。
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackDefinition> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| StackError::IoError {
        path: path.as_ref().to_path_buf(),
        message: e.to_string(),
    })?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("stack")
        .to_string();
    parse_stack_string(&content, name)
}

/// KDL文字列をパース
pub fn parse_stack_string(content: &str, default_name: String) -> Result<StackDefinition> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut network: Option<String> = None;
    let mut report_path: Option<PathBuf> = None;
    let mut health = HealthCheckConfig::default();
    let mut services: Vec<ServiceSpec> = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" | "project" => {
                if let Some(stack_name) = first_string(node) {
                    name = stack_name.to_string();
                }
            }
            "network" => {
                network = first_string(node).map(|s| s.to_string());
            }
            "report" => {
                report_path = first_string(node)
                    .or_else(|| node.get("path").and_then(|v| v.as_string()))
                    .map(PathBuf::from);
            }
            "health" => {
                if let Some(children) = node.children() {
                    health = parse_health(children);
                }
            }
            "service" => {
                let service = parse_service(node)?;
                if services.iter().any(|s| s.name == service.name) {
                    return Err(StackError::DuplicateService(service.name));
                }
                services.push(service);
            }
            other => {
                debug!(node = other, "Skipping unknown top-level node");
            }
        }
    }

    let mut stack = StackDefinition::new(name);
    if let Some(network) = network {
        stack.network = network;
    }
    stack.report_path = report_path;
    stack.health = health;
    stack.services = services;

    debug!(
        stack = %stack.name,
        services = stack.services.len(),
        "Parsed stack definition"
    );

    Ok(stack)
}

/// healthブロックをパース
fn parse_health(doc: &KdlDocument) -> HealthCheckConfig {
    let mut config = HealthCheckConfig::default();

    for node in doc.nodes() {
        let Some(value) = first_integer(node) else {
            continue;
        };
        match node.name().value() {
            "initial_delay" => config.initial_delay_ms = value.max(0) as u64,
            "interval" => config.interval_ms = value.max(0) as u64,
            "attempts" => config.max_attempts = value.clamp(1, u32::MAX as i128) as u32,
            _ => {}
        }
    }

    config
}

/// 位置引数（プロパティ以外のエントリ）を列挙
fn arguments(node: &KdlNode) -> impl Iterator<Item = &KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
}

fn first_string(node: &KdlNode) -> Option<&str> {
    arguments(node).next().and_then(|v| v.as_string())
}

fn first_integer(node: &KdlNode) -> Option<i128> {
    arguments(node).next().and_then(|v| v.as_integer())
}

#[cfg(test)]
mod tests;
