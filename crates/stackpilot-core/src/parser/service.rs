//! サービスノードのパース

use super::port::parse_port;
use super::volume::{parse_bool_with_hint, parse_volume};
use super::{arguments, first_string};
use crate::error::{Result, StackError};
use crate::model::{
    CredentialRule, CredentialSpec, DEFAULT_SECRET_LENGTH, Port, RestartPolicy, ServiceSpec,
};
use kdl::KdlNode;

/// service ノードをパース
pub fn parse_service(node: &KdlNode) -> Result<ServiceSpec> {
    let name = first_string(node)
        .ok_or_else(|| StackError::InvalidConfig("service requires a name".to_string()))?
        .to_string();

    let mut service = ServiceSpec {
        name: name.clone(),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "image" => {
                    service.image = first_string(child).unwrap_or_default().to_string();
                }
                "display" => {
                    service.display_name = first_string(child).map(|s| s.to_string());
                }
                "command" => {
                    service.command = first_string(child).map(|s| s.to_string());
                }
                "network" => {
                    service.network = first_string(child).map(|s| s.to_string());
                }
                "ports" => {
                    if let Some(ports) = child.children() {
                        for port_node in ports.nodes() {
                            if port_node.name().value() == "port" {
                                service.ports.push(require_port(port_node, &name)?);
                            }
                        }
                    }
                }
                "port" => {
                    service.ports.push(require_port(child, &name)?);
                }
                "environment" | "env" => {
                    if let Some(envs) = child.children() {
                        for env_node in envs.nodes() {
                            let key = env_node.name().value().to_string();
                            let value = first_string(env_node)
                                .map(|s| s.to_string())
                                .or_else(|| {
                                    arguments(env_node).next().map(|v| v.to_string())
                                })
                                .unwrap_or_default();
                            service.environment.insert(key, value);
                        }
                    } else if let Some(val) = first_string(child)
                        && let Some((k, v)) = val.split_once('=')
                    {
                        // フラットな env "KEY=VALUE" 形式
                        service
                            .environment
                            .insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
                "volumes" => {
                    if let Some(vols) = child.children() {
                        for vol_node in vols.nodes() {
                            if vol_node.name().value() == "volume" {
                                service.volumes.push(parse_volume(vol_node)?);
                            }
                        }
                    }
                }
                "volume" => {
                    service.volumes.push(parse_volume(child)?);
                }
                "depends_on" => {
                    service.depends_on.extend(
                        arguments(child).filter_map(|v| v.as_string().map(|s| s.to_string())),
                    );
                }
                "restart" => {
                    if let Some(policy_str) = first_string(child) {
                        service.restart = RestartPolicy::parse(policy_str).ok_or_else(|| {
                            StackError::InvalidConfig(format!(
                                "サービス '{}' の restart ポリシーが不正です: {}",
                                name, policy_str
                            ))
                        })?;
                    }
                }
                "credential" => {
                    let credential = parse_credential(child)?;
                    if service.credential(&credential.key).is_some() {
                        return Err(StackError::InvalidConfig(format!(
                            "サービス '{}' で認証情報 '{}' が重複しています",
                            name, credential.key
                        )));
                    }
                    service.credentials.push(credential);
                }
                "url" => {
                    if let Some(url) = first_string(child) {
                        service.urls.push(url.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    if service.image.is_empty() {
        return Err(StackError::MissingImage(name));
    }

    Ok(service)
}

/// port ノードをパース（不正な値はエラー）
fn require_port(node: &KdlNode, service: &str) -> Result<Port> {
    parse_port(node).ok_or_else(|| {
        StackError::InvalidConfig(format!("サービス '{}' の port が不正です", service))
    })
}

/// credential ノードをパース
///
/// - `credential "password" generate=#true length=32`
/// - `credential "admin_email" prompt="..." secret=#false`
/// - `credential "database" value="wordpress"`
///
/// ルールが何も指定されていない場合は生成扱い。
fn parse_credential(node: &KdlNode) -> Result<CredentialSpec> {
    let key = first_string(node)
        .ok_or_else(|| StackError::InvalidConfig("credential requires a key".to_string()))?
        .to_string();

    if let Some(value) = node.get("value").and_then(|v| v.as_string()) {
        if value.trim().is_empty() {
            return Err(StackError::InvalidConfig(format!(
                "認証情報 '{}' の value が空です",
                key
            )));
        }
        return Ok(CredentialSpec {
            key,
            rule: CredentialRule::Literal(value.to_string()),
        });
    }

    if let Some(prompt) = node.get("prompt").and_then(|v| v.as_string()) {
        return Ok(CredentialSpec {
            key,
            rule: CredentialRule::Supplied {
                prompt: prompt.to_string(),
                secret: parse_bool_with_hint(node, "secret").unwrap_or(false),
            },
        });
    }

    let length = match node.get("length").and_then(|v| v.as_integer()) {
        Some(len) if (8..=256).contains(&len) => len as usize,
        Some(len) => {
            return Err(StackError::InvalidConfig(format!(
                "認証情報 '{}' の length は 8〜256 の範囲で指定してください: {}",
                key, len
            )));
        }
        None => DEFAULT_SECRET_LENGTH,
    };

    Ok(CredentialSpec {
        key,
        rule: CredentialRule::Generated { length },
    })
}
