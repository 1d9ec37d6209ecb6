pub mod args;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use args::{Args, USAGE};
pub use cli::CliApp;
pub use error::AppError;
