pub mod plan;
pub mod reset;
pub mod up;
