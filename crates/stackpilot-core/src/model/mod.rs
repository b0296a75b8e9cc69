//! モデル定義
//!
//! StackPilotで使用されるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod credential;
mod health;
mod port;
mod service;
mod stack;
mod volume;

// Re-exports
pub use credential::*;
pub use health::*;
pub use port::*;
pub use service::*;
pub use stack::*;
pub use volume::*;
