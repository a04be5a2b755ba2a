//! 核心层：错误类型、运行器抽象与调用方截止时间

pub mod error;
pub mod runner;

pub use error::ResearchError;
pub use runner::{run_with_deadline, validate_topic, ResearchRunner};
