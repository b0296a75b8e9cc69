//! StackPilot
//!
//! 1台のDockerホストにセルフホスト用のサービス群を順番に構築し、
//! 生成した認証情報をレポートとして書き出します。

pub mod context;
pub mod deployer;
pub mod error;
pub mod host;
pub mod prompt;

pub use context::{RunContext, RunOptions};
pub use deployer::{DeployEvent, Deployer};
pub use error::{DeployError, Result};
pub use host::resolve_host_address;
pub use prompt::{EnvPrompt, StdinPrompt};
