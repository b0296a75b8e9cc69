use super::*;
use crate::model::{CredentialRule, Protocol, RestartPolicy, VolumeSource};
use std::path::PathBuf;

#[test]
fn test_parse_simple_service() {
    let kdl = r#"
        service "mariadb" {
            image "mariadb:11"
        }
    "#;

    let stack = parse_stack_string(kdl, "test".to_string()).unwrap();
    assert_eq!(stack.name, "test");
    assert_eq!(stack.network, "test-net");
    assert_eq!(stack.services.len(), 1);

    let service = stack.service("mariadb").unwrap();
    assert_eq!(service.image, "mariadb:11");
    assert_eq!(service.restart, RestartPolicy::No);
}

#[test]
fn test_parse_service_without_image_error() {
    let kdl = r#"
        service "redis" {}
    "#;

    let result = parse_stack_string(kdl, "test".to_string());
    assert!(matches!(result, Err(StackError::MissingImage(name)) if name == "redis"));
}

#[test]
fn test_parse_stack_header() {
    let kdl = r#"
        stack "homelab"
        network "lab"
        report "/root/homelab-credentials.txt"
        health {
            initial_delay 500
            interval 250
            attempts 8
        }
        service "db" {
            image "mariadb"
        }
    "#;

    let stack = parse_stack_string(kdl, "ignored".to_string()).unwrap();
    assert_eq!(stack.name, "homelab");
    assert_eq!(stack.network, "lab");
    assert_eq!(
        stack.report_path,
        Some(PathBuf::from("/root/homelab-credentials.txt"))
    );
    assert_eq!(stack.health.initial_delay_ms, 500);
    assert_eq!(stack.health.interval_ms, 250);
    assert_eq!(stack.health.max_attempts, 8);
}

#[test]
fn test_parse_service_with_ports() {
    let kdl = r#"
        service "proxy" {
            image "jc21/nginx-proxy-manager"
            ports {
                port 80
                port host=8443 container=443
                port 5353 53 protocol="udp" host_ip="127.0.0.1"
            }
            port 81 81
        }
    "#;

    let stack = parse_stack_string(kdl, "test".to_string()).unwrap();
    let ports = &stack.service("proxy").unwrap().ports;
    assert_eq!(ports.len(), 4);

    assert_eq!((ports[0].host, ports[0].container), (80, 80));
    assert_eq!((ports[1].host, ports[1].container), (8443, 443));
    assert_eq!(ports[2].protocol, Protocol::Udp);
    assert_eq!(ports[2].host_ip.as_deref(), Some("127.0.0.1"));
    assert_eq!(ports[2].container_key(), "53/udp");
    assert_eq!((ports[3].host, ports[3].container), (81, 81));
}

#[test]
fn test_parse_invalid_port_is_error() {
    let kdl = r#"
        service "web" {
            image "nginx"
            port 70000
        }
    "#;

    assert!(parse_stack_string(kdl, "test".to_string()).is_err());
}

#[test]
fn test_parse_environment_keeps_templates() {
    let kdl = r#"
        service "wordpress" {
            image "wordpress:6"
            env {
                WORDPRESS_DB_HOST "mariadb"
                WORDPRESS_DB_PASSWORD "{{ mariadb.root_password }}"
                WORDPRESS_DEBUG 0
            }
        }
    "#;

    let stack = parse_stack_string(kdl, "test".to_string()).unwrap();
    let env = &stack.service("wordpress").unwrap().environment;
    assert_eq!(env["WORDPRESS_DB_HOST"], "mariadb");
    assert_eq!(env["WORDPRESS_DB_PASSWORD"], "{{ mariadb.root_password }}");
    assert_eq!(env["WORDPRESS_DEBUG"], "0");
}

#[test]
fn test_parse_volumes() {
    let kdl = r#"
        service "code-server" {
            image "lscr.io/linuxserver/code-server"
            volumes {
                volume "/opt/homelab/code" "/config" owner="1000:1000" mode="0750"
                volume "code-cache" "/cache"
            }
            volume "/proc" "/host/proc" read_only=#true
        }
    "#;

    let stack = parse_stack_string(kdl, "test".to_string()).unwrap();
    let volumes = &stack.service("code-server").unwrap().volumes;
    assert_eq!(volumes.len(), 3);

    assert_eq!(
        volumes[0].source,
        VolumeSource::HostPath(PathBuf::from("/opt/homelab/code"))
    );
    assert_eq!(volumes[0].owner.map(|o| (o.uid, o.gid)), Some((1000, 1000)));
    assert_eq!(volumes[0].mode, Some(0o750));
    assert!(volumes[0].needs_preparation());

    assert_eq!(volumes[1].source, VolumeSource::Named("code-cache".to_string()));
    assert!(!volumes[1].needs_preparation());

    assert!(volumes[2].read_only);
}

#[test]
fn test_parse_volume_requires_two_paths() {
    let kdl = r#"
        service "db" {
            image "mariadb"
            volume "/var/lib/mysql"
        }
    "#;

    let result = parse_stack_string(kdl, "test".to_string());
    assert!(matches!(result, Err(StackError::InvalidConfig(_))));
}

#[test]
fn test_parse_credentials() {
    let kdl = r#"
        service "npm" {
            image "jc21/nginx-proxy-manager"
            credential "admin_email" prompt="管理者メールアドレス"
            credential "admin_password" generate=#true length=32
            credential "token"
            credential "database" value="npm"
        }
    "#;

    let stack = parse_stack_string(kdl, "test".to_string()).unwrap();
    let service = stack.service("npm").unwrap();
    assert_eq!(service.credentials.len(), 4);

    assert_eq!(
        service.credential("admin_email").unwrap().rule,
        CredentialRule::Supplied {
            prompt: "管理者メールアドレス".to_string(),
            secret: false,
        }
    );
    assert_eq!(
        service.credential("admin_password").unwrap().rule,
        CredentialRule::Generated { length: 32 }
    );
    assert_eq!(
        service.credential("token").unwrap().rule,
        CredentialRule::Generated {
            length: crate::model::DEFAULT_SECRET_LENGTH
        }
    );
    assert_eq!(
        service.credential("database").unwrap().rule,
        CredentialRule::Literal("npm".to_string())
    );
}

#[test]
fn test_parse_invalid_port_in_ports_block_is_error() {
    let kdl = r#"
        service "web" {
            image "nginx"
            ports {
                port host=8080 container=80
                port host=70000 container=80
            }
        }
    "#;

    let err = parse_stack_string(kdl, "test".to_string()).unwrap_err();
    assert!(matches!(err, StackError::InvalidConfig(ref msg) if msg.contains("web")));
}

#[test]
fn test_parse_credential_length_out_of_range() {
    let kdl = r#"
        service "db" {
            image "mariadb"
            credential "root_password" length=4
        }
    "#;

    assert!(parse_stack_string(kdl, "test".to_string()).is_err());
}

#[test]
fn test_parse_blank_literal_credential_is_error() {
    let kdl = r#"
        service "wordpress" {
            image "wordpress"
            credential "database" value=""
        }
    "#;

    let err = parse_stack_string(kdl, "test".to_string()).unwrap_err();
    assert!(matches!(err, StackError::InvalidConfig(ref msg) if msg.contains("database")));

    let kdl = r#"
        service "wordpress" {
            image "wordpress"
            credential "database" value="  "
        }
    "#;
    assert!(parse_stack_string(kdl, "test".to_string()).is_err());
}

#[test]
fn test_parse_duplicate_credential_key() {
    let kdl = r#"
        service "db" {
            image "mariadb"
            credential "root_password"
            credential "root_password" value="x"
        }
    "#;

    assert!(parse_stack_string(kdl, "test".to_string()).is_err());
}

#[test]
fn test_parse_depends_on_and_misc() {
    let kdl = r#"
        service "nextcloud" {
            display "Nextcloud"
            image "nextcloud:29"
            restart "unless-stopped"
            network "edge"
            command "apache2-foreground"
            depends_on "mariadb" "redis"
            url "http://{{ host }}:8081"
        }
    "#;

    let stack = parse_stack_string(kdl, "test".to_string()).unwrap();
    let service = stack.service("nextcloud").unwrap();
    assert_eq!(service.display(), "Nextcloud");
    assert_eq!(service.restart, RestartPolicy::UnlessStopped);
    assert_eq!(service.network.as_deref(), Some("edge"));
    assert_eq!(service.command.as_deref(), Some("apache2-foreground"));
    assert_eq!(service.depends_on, vec!["mariadb", "redis"]);
    assert_eq!(service.urls, vec!["http://{{ host }}:8081"]);
}

#[test]
fn test_parse_invalid_restart_policy() {
    let kdl = r#"
        service "db" {
            image "mariadb"
            restart "sometimes"
        }
    "#;

    assert!(parse_stack_string(kdl, "test".to_string()).is_err());
}

#[test]
fn test_parse_duplicate_service() {
    let kdl = r#"
        service "db" { image "mariadb" }
        service "db" { image "postgres" }
    "#;

    let result = parse_stack_string(kdl, "test".to_string());
    assert!(matches!(result, Err(StackError::DuplicateService(name)) if name == "db"));
}

#[test]
fn test_parse_preserves_declaration_order() {
    let kdl = r#"
        service "c" { image "c" }
        service "a" { image "a" }
        service "b" { image "b" }
    "#;

    let stack = parse_stack_string(kdl, "test".to_string()).unwrap();
    let names: Vec<&str> = stack.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

#[test]
fn test_parse_invalid_kdl() {
    let result = parse_stack_string("service \"db\" {", "test".to_string());
    assert!(matches!(result, Err(StackError::KdlParse(_))));
}

#[test]
fn test_parse_stack_file_uses_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("myhome");
    std::fs::create_dir(&project).unwrap();
    let path = project.join("stack.kdl");
    std::fs::write(&path, "service \"db\" { image \"mariadb\" }").unwrap();

    let stack = parse_stack_file(&path).unwrap();
    assert_eq!(stack.name, "myhome");
    assert_eq!(stack.network, "myhome-net");
}

#[test]
fn test_parse_stack_file_missing() {
    let result = parse_stack_file("/nonexistent/stack.kdl");
    assert!(matches!(result, Err(StackError::IoError { .. })));
}
