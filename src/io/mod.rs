pub mod csv_reader;
pub mod csv_writer;
pub mod error;
pub mod parse;

// Re-export commonly used types
pub use csv_reader::{load_file, load_records};
pub use csv_writer::{RecordWriter, write_records};
pub use error::IoError;
pub use parse::RecordLayout;
