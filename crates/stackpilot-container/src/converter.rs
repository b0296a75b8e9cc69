//! ServiceSpec → RunRequest → Docker API パラメータへの変換

// Bollard 0.19 の非推奨APIを使用
#![allow(deprecated)]

use crate::runtime::{RunRequest, container_name, service_labels};
use bollard::container::{Config, CreateContainerOptions, NetworkingConfig};
use bollard::models::{
    EndpointSettings, HostConfig, PortBinding, RestartPolicy as DockerRestartPolicy,
    RestartPolicyNameEnum,
};
use stackpilot_core::{RestartPolicy, ServiceSpec, VolumeSource};
use std::collections::{BTreeMap, HashMap};

/// サービス定義と展開済みの環境変数から起動要求を組み立てる
pub fn build_run_request(
    stack: &str,
    spec: &ServiceSpec,
    network: &str,
    env: BTreeMap<String, String>,
) -> RunRequest {
    RunRequest {
        name: container_name(stack, &spec.name),
        service: spec.name.clone(),
        stack: stack.to_string(),
        image: spec.image_reference(),
        // コマンドをスペースで分割
        command: spec
            .command
            .as_ref()
            .map(|c| c.split_whitespace().map(String::from).collect()),
        env,
        ports: spec.ports.clone(),
        mounts: spec.volumes.clone(),
        network: network.to_string(),
        aliases: vec![spec.name.clone()],
        restart: spec.restart,
        labels: service_labels(stack, &spec.name),
    }
}

/// 起動要求をDockerのコンテナ設定に変換
pub fn run_request_to_container_config(
    request: &RunRequest,
) -> (Config<String>, CreateContainerOptions<String>) {
    let env: Vec<String> = request
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let mut port_bindings = HashMap::new();
    let mut exposed_ports = HashMap::new();

    for port in &request.ports {
        let container_port = port.container_key();
        exposed_ports.insert(container_port.clone(), HashMap::new());

        let host_ip = port.host_ip.as_deref().unwrap_or("0.0.0.0");
        port_bindings.insert(
            container_port,
            Some(vec![PortBinding {
                host_ip: Some(host_ip.to_string()),
                host_port: Some(port.host.to_string()),
            }]),
        );
    }

    let binds: Vec<String> = request
        .mounts
        .iter()
        .map(|v| {
            let mode = if v.read_only { "ro" } else { "rw" };
            let source = match &v.source {
                // 相対パスの場合は絶対パスに変換
                VolumeSource::HostPath(path) if path.is_relative() => std::env::current_dir()
                    .unwrap_or_else(|_| path.clone())
                    .join(path)
                    .display()
                    .to_string(),
                VolumeSource::HostPath(path) => path.display().to_string(),
                VolumeSource::Named(name) => name.clone(),
            };
            format!("{}:{}:{}", source, v.container.display(), mode)
        })
        .collect();

    let restart_policy = match request.restart {
        RestartPolicy::No => None,
        policy => Some(DockerRestartPolicy {
            name: Some(match policy {
                RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
                RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
                RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
                RestartPolicy::No => RestartPolicyNameEnum::NO,
            }),
            maximum_retry_count: None,
        }),
    };

    let host_config = Some(HostConfig {
        port_bindings: Some(port_bindings),
        binds: Some(binds),
        network_mode: Some(request.network.clone()),
        restart_policy,
        ..Default::default()
    });

    // サービス名をネットワーク内のホスト名にする
    let mut endpoints = HashMap::new();
    endpoints.insert(
        request.network.clone(),
        EndpointSettings {
            aliases: Some(request.aliases.clone()),
            ..Default::default()
        },
    );

    let config = Config {
        image: Some(request.image.clone()),
        env: Some(env),
        exposed_ports: Some(exposed_ports),
        host_config,
        labels: Some(request.labels.clone()),
        cmd: request.command.clone(),
        networking_config: Some(NetworkingConfig {
            endpoints_config: endpoints,
        }),
        ..Default::default()
    };

    let options = CreateContainerOptions {
        name: request.name.clone(),
        platform: None,
    };

    (config, options)
}

/// 起動要求が使用する名前付きボリューム
pub fn named_volumes(request: &RunRequest) -> Vec<&str> {
    request
        .mounts
        .iter()
        .filter_map(|m| match &m.source {
            VolumeSource::Named(name) => Some(name.as_str()),
            VolumeSource::HostPath(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpilot_core::{Port, Protocol, VolumeMount};
    use std::path::PathBuf;

    fn request_for(spec: &ServiceSpec) -> RunRequest {
        build_run_request("homelab", spec, "homelab-net", BTreeMap::new())
    }

    #[test]
    fn test_basic_request() {
        let spec = ServiceSpec::new("mariadb", "mariadb");
        let request = request_for(&spec);

        assert_eq!(request.name, "homelab-mariadb");
        assert_eq!(request.image, "mariadb:latest");
        assert_eq!(request.aliases, vec!["mariadb"]);

        let (config, options) = run_request_to_container_config(&request);
        assert_eq!(config.image, Some("mariadb:latest".to_string()));
        assert_eq!(options.name, "homelab-mariadb");
    }

    #[test]
    fn test_environment() {
        let spec = ServiceSpec::new("wordpress", "wordpress:6");
        let mut env = BTreeMap::new();
        env.insert("WORDPRESS_DB_HOST".to_string(), "mariadb".to_string());
        env.insert("WORDPRESS_DB_PASSWORD".to_string(), "secret".to_string());
        let request = build_run_request("homelab", &spec, "homelab-net", env);

        let (config, _) = run_request_to_container_config(&request);
        let env = config.env.unwrap();
        assert!(env.contains(&"WORDPRESS_DB_HOST=mariadb".to_string()));
        assert!(env.contains(&"WORDPRESS_DB_PASSWORD=secret".to_string()));
    }

    #[test]
    fn test_ports() {
        let mut spec = ServiceSpec::new("proxy", "jc21/nginx-proxy-manager");
        spec.ports = vec![
            Port {
                host: 8080,
                container: 80,
                protocol: Protocol::Tcp,
                host_ip: None,
            },
            Port {
                host: 81,
                container: 81,
                protocol: Protocol::Tcp,
                host_ip: Some("127.0.0.1".to_string()),
            },
            Port {
                host: 5353,
                container: 53,
                protocol: Protocol::Udp,
                host_ip: None,
            },
        ];

        let (config, _) = run_request_to_container_config(&request_for(&spec));

        let exposed_ports = config.exposed_ports.unwrap();
        assert!(exposed_ports.contains_key("80/tcp"));
        assert!(exposed_ports.contains_key("53/udp"));

        let port_bindings = config.host_config.unwrap().port_bindings.unwrap();
        let binding_80 = port_bindings.get("80/tcp").unwrap().as_ref().unwrap();
        assert_eq!(binding_80[0].host_port, Some("8080".to_string()));
        assert_eq!(binding_80[0].host_ip, Some("0.0.0.0".to_string()));

        let binding_81 = port_bindings.get("81/tcp").unwrap().as_ref().unwrap();
        assert_eq!(binding_81[0].host_ip, Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_volumes() {
        let mut spec = ServiceSpec::new("portainer", "portainer/portainer-ce");
        spec.volumes = vec![
            VolumeMount {
                source: VolumeSource::HostPath(PathBuf::from("/var/run/docker.sock")),
                container: PathBuf::from("/var/run/docker.sock"),
                read_only: false,
                owner: None,
                mode: None,
            },
            VolumeMount {
                source: VolumeSource::Named("portainer-data".to_string()),
                container: PathBuf::from("/data"),
                read_only: false,
                owner: None,
                mode: None,
            },
            VolumeMount {
                source: VolumeSource::HostPath(PathBuf::from("/proc")),
                container: PathBuf::from("/host/proc"),
                read_only: true,
                owner: None,
                mode: None,
            },
        ];

        let request = request_for(&spec);
        assert_eq!(named_volumes(&request), vec!["portainer-data"]);

        let (config, _) = run_request_to_container_config(&request);
        let binds = config.host_config.unwrap().binds.unwrap();
        assert_eq!(
            binds,
            vec![
                "/var/run/docker.sock:/var/run/docker.sock:rw",
                "portainer-data:/data:rw",
                "/proc:/host/proc:ro",
            ]
        );
    }

    #[test]
    fn test_command() {
        let mut spec = ServiceSpec::new("db", "mariadb");
        spec.command = Some("--character-set-server=utf8mb4 --skip-name-resolve".to_string());

        let (config, _) = run_request_to_container_config(&request_for(&spec));
        assert_eq!(
            config.cmd.unwrap(),
            vec!["--character-set-server=utf8mb4", "--skip-name-resolve"]
        );
    }

    #[test]
    fn test_restart_policy() {
        let mut spec = ServiceSpec::new("db", "mariadb");
        let (config, _) = run_request_to_container_config(&request_for(&spec));
        assert!(config.host_config.unwrap().restart_policy.is_none());

        spec.restart = RestartPolicy::UnlessStopped;
        let (config, _) = run_request_to_container_config(&request_for(&spec));
        let policy = config.host_config.unwrap().restart_policy.unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::UNLESS_STOPPED));
    }

    #[test]
    fn test_network_and_labels() {
        let spec = ServiceSpec::new("nextcloud", "nextcloud");
        let (config, _) = run_request_to_container_config(&request_for(&spec));

        let host_config = config.host_config.unwrap();
        assert_eq!(host_config.network_mode, Some("homelab-net".to_string()));

        let endpoints = config.networking_config.unwrap().endpoints_config;
        assert_eq!(
            endpoints["homelab-net"].aliases,
            Some(vec!["nextcloud".to_string()])
        );

        let labels = config.labels.unwrap();
        assert_eq!(labels.get("stackpilot.managed"), Some(&"true".to_string()));
        assert_eq!(labels.get("stackpilot.stack"), Some(&"homelab".to_string()));
        assert_eq!(labels.get("stackpilot.service"), Some(&"nextcloud".to_string()));
        assert_eq!(
            labels.get("com.docker.compose.project"),
            Some(&"homelab".to_string())
        );
        assert_eq!(labels.len(), 5);
    }
}
