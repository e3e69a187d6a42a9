// Library exports for embedding the conversion engine in other tools
pub mod cli;
pub mod conversion;
pub mod error;
pub mod json_output;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use conversion::batch::{BatchOptions, BatchReport, ConversionRecord};
pub use conversion::format::ImageFormatKind;
pub use conversion::info::ImageInfo;
pub use conversion::validate::ValidationReport;
pub use conversion::{ConversionConfig, Converter};
pub use error::ConvertError;
pub use json_output::JsonMessage;
pub use report::{ConsoleReporter, MemoryReporter, NullReporter, Reporter};
