//! CLI command implementations

pub mod config;
pub mod generate;
pub mod models;
pub mod operations;

pub use config::ConfigCommand;
pub use generate::GenerateCommand;
pub use models::ModelsCommand;
pub use operations::OperationsCommand;
