//! ボリューム定義

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// マウント元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSource {
    /// ホストのディレクトリ（バインドマウント）
    HostPath(PathBuf),
    /// 名前付きボリューム（オーナーラベル付きで作成される）
    Named(String),
}

impl VolumeSource {
    /// `/` または `.` で始まればホストパス、それ以外は名前付きボリューム
    pub fn parse(value: &str) -> Self {
        if value.starts_with('/') || value.starts_with('.') {
            VolumeSource::HostPath(PathBuf::from(value))
        } else {
            VolumeSource::Named(value.to_string())
        }
    }
}

/// ディレクトリの所有者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    /// `uid:gid` 形式をパース（`uid` のみの場合は gid も同じ値）
    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((uid, gid)) => Some(Self {
                uid: uid.trim().parse().ok()?,
                gid: gid.trim().parse().ok()?,
            }),
            None => {
                let id = s.trim().parse().ok()?;
                Some(Self { uid: id, gid: id })
            }
        }
    }
}

/// ボリュームマウント定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub source: VolumeSource,
    pub container: PathBuf,
    #[serde(default)]
    pub read_only: bool,
    /// 起動前にホストディレクトリへ適用する所有者
    #[serde(default)]
    pub owner: Option<Ownership>,
    /// 起動前にホストディレクトリへ適用するパーミッション（例: 0o750）
    #[serde(default)]
    pub mode: Option<u32>,
}

impl VolumeMount {
    /// ホストディレクトリの事前準備が必要か
    pub fn needs_preparation(&self) -> bool {
        matches!(self.source, VolumeSource::HostPath(_))
            && (self.owner.is_some() || self.mode.is_some())
    }
}

/// `0750` / `750` / `0o750` 形式の8進数パーミッションをパース
pub fn parse_mode(s: &str) -> Option<u32> {
    let digits = s.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8).ok().filter(|m| *m <= 0o7777)
}
