//! StackPilot core
//!
//! スタック定義のモデルとKDLパーサー、依存関係に基づくデプロイ計画、
//! 認証情報の解決とレポート出力を提供します。

pub mod builtin;
pub mod credentials;
pub mod error;
pub mod model;
pub mod parser;
pub mod plan;
pub mod report;
pub mod template;

pub use builtin::{DEFAULT_STACK_KDL, default_stack};
pub use credentials::{CredentialManager, CredentialPrompt, CredentialSet, generate_secret};
pub use error::{CredentialError, Result, StackError};
pub use model::*;
pub use parser::{parse_stack_file, parse_stack_string};
pub use plan::DeploymentPlan;
pub use report::{
    CredentialReport, REPORT_FILE_MODE, ReportBuilder, ReportEntry, discard_stale_report,
    write_report,
};
pub use template::{expand_environment, expand_template};
