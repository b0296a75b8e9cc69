//! ポートノードのパース

use super::arguments;
use crate::model::{Port, Protocol};
use kdl::KdlNode;

/// port ノードをパース
///
/// サポートされる形式:
/// - 名前付き引数: port host=8080 container=3000
/// - 位置引数: port 8080 3000
pub fn parse_port(node: &KdlNode) -> Option<Port> {
    let mut positional = arguments(node).filter_map(|v| v.as_integer());
    let first = positional.next();
    let second = positional.next();

    let host = node
        .get("host")
        .and_then(|e| e.as_integer())
        .or(first)
        .and_then(|v| u16::try_from(v).ok())?;

    let container = node
        .get("container")
        .and_then(|e| e.as_integer())
        .or(second)
        .or(first)
        .and_then(|v| u16::try_from(v).ok())?;

    let protocol = node
        .get("protocol")
        .and_then(|e| e.as_string())
        .and_then(Protocol::parse)
        .unwrap_or_default();

    let host_ip = node
        .get("host_ip")
        .and_then(|e| e.as_string())
        .map(|s| s.to_string());

    Some(Port {
        host,
        container,
        protocol,
        host_ip,
    })
}
