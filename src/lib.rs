pub mod config;
pub mod database;
pub mod error;
pub mod registry;

pub use config::Settings;
pub use database::Database;
pub use error::AppError;
pub use registry::{
    test_all, ConnectionTest, McpRegistry, ServerConfig, TestOutcome, ToolDescriptor,
};
