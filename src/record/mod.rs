mod error;
mod sample;
pub mod writer;

pub use error::WriterError;
pub use sample::Sample;
pub use writer::CsvLog;
