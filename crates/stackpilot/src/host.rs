//! ホストアドレスの決定

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::debug;

/// 自動検出に失敗した場合のアドレス
pub const FALLBACK_HOST_ADDRESS: &str = "127.0.0.1";

/// レポートとURLに使うホストアドレス
///
/// 設定値があればそれを使い、なければ外向きUDPソケットのローカルアドレス、
/// それも取れなければ `127.0.0.1` を返します。
pub fn resolve_host_address(configured: Option<&str>) -> String {
    if let Some(address) = configured.map(str::trim).filter(|a| !a.is_empty()) {
        return address.to_string();
    }

    match detect_outbound_address() {
        Some(ip) => ip.to_string(),
        None => {
            debug!("Host address detection failed, using loopback");
            FALLBACK_HOST_ADDRESS.to_string()
        }
    }
}

/// 外向きの経路に使われるローカルアドレス
///
/// UDPの connect はパケットを送信しません。
fn detect_outbound_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() {
        return None;
    }
    debug!(%ip, "Detected host address");
    Some(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_address_wins() {
        assert_eq!(resolve_host_address(Some("192.168.1.10")), "192.168.1.10");
    }

    #[test]
    fn test_blank_configured_address_is_ignored() {
        let address = resolve_host_address(Some("  "));
        assert!(address.parse::<IpAddr>().is_ok());
    }

    #[test]
    fn test_detected_address_is_an_ip() {
        assert!(resolve_host_address(None).parse::<IpAddr>().is_ok());
    }
}
