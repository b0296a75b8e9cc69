//! 組み込みスタック

use crate::error::Result;
use crate::model::StackDefinition;
use crate::parser::parse_stack_string;

/// 組み込みスタックのKDLソース
pub const DEFAULT_STACK_KDL: &str = include_str!("../assets/default-stack.kdl");

/// 組み込みスタックを読み込む
pub fn default_stack() -> Result<StackDefinition> {
    parse_stack_string(DEFAULT_STACK_KDL, "homelab".to_string())
}
