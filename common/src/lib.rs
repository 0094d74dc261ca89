pub mod buffer2;
pub mod file_format;
pub mod log_setup;

pub use buffer2::Buffer2;
pub use file_format::{
    deserialize, read_from_file, serialize, FileExtensionError, FileFormat, ReadFileError,
    SerdeFormatError,
};
pub use log_setup::{setup_logging, LogConfig, LogSetupError};
