//! ボリュームノードのパース

use super::arguments;
use crate::error::{Result, StackError};
use crate::model::{Ownership, VolumeMount, VolumeSource, parse_mode};
use kdl::KdlNode;
use std::path::PathBuf;

/// volume ノードをパース
///
/// ```kdl
/// volume "/opt/homelab/mariadb" "/var/lib/mysql" owner="999:999" mode="0750"
/// volume "portainer-data" "/data"
/// volume "/proc" "/host/proc" read_only=#true
/// ```
pub fn parse_volume(node: &KdlNode) -> Result<VolumeMount> {
    let mut args = arguments(node).filter_map(|v| v.as_string());
    let (Some(source), Some(container)) = (args.next(), args.next()) else {
        return Err(StackError::InvalidConfig(
            "volume には ホスト側 と コンテナ側 の2つのパスが必要です".to_string(),
        ));
    };

    let read_only = parse_bool_with_hint(node, "read_only").unwrap_or(false);

    let owner = match node.get("owner").and_then(|v| v.as_string()) {
        Some(raw) => Some(Ownership::parse(raw).ok_or_else(|| {
            StackError::InvalidConfig(format!(
                "volume owner は uid:gid 形式で指定してください: {}",
                raw
            ))
        })?),
        None => None,
    };

    // mode="0750" と mode=0o750 の両方を受け付ける
    let mode = match node.get("mode") {
        Some(value) => {
            let parsed = value
                .as_string()
                .and_then(parse_mode)
                .or_else(|| value.as_integer().and_then(|v| u32::try_from(v).ok()));
            Some(parsed.ok_or_else(|| {
                StackError::InvalidConfig(format!("volume mode が不正です: {}", value))
            })?)
        }
        None => None,
    };

    Ok(VolumeMount {
        source: VolumeSource::parse(source),
        container: PathBuf::from(container),
        read_only,
        owner,
        mode,
    })
}

/// ブール値をパースし、`true`/`false` 文字列が使用された場合は警告を出力
/// KDL v2では `#true`/`#false` を使用する必要がある
pub(super) fn parse_bool_with_hint(node: &KdlNode, key: &str) -> Option<bool> {
    if let Some(value) = node.get(key).and_then(|e| e.as_bool()) {
        return Some(value);
    }

    if let Some(entry) = node.get(key)
        && let Some(str_value) = entry.as_string()
    {
        match str_value {
            "true" => {
                tracing::warn!(
                    "'{key}=\"true\"' is a string, not a boolean. In KDL v2, use '{key}=#true'"
                );
                return Some(true);
            }
            "false" => {
                tracing::warn!(
                    "'{key}=\"false\"' is a string, not a boolean. In KDL v2, use '{key}=#false'"
                );
                return Some(false);
            }
            _ => {}
        }
    }

    None
}
