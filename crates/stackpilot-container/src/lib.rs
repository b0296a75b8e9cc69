//! StackPilot container
//!
//! コンテナランタイムの抽象化（`ContainerRuntime`）と Docker 実装、
//! ネットワーク・サービス起動・起動確認・クリーンアップを提供します。

pub mod cleanup;
pub mod converter;
pub mod docker;
pub mod error;
pub mod launcher;
pub mod network;
pub mod runtime;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod waiter;

pub use cleanup::*;
pub use converter::*;
pub use docker::*;
pub use error::*;
pub use launcher::*;
pub use network::*;
pub use runtime::*;
pub use waiter::*;
