use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum FileExtensionError {
    #[error("Failed to get file extension")]
    MissingFileExtension,
    #[error("Unsupported file extension for file: {0}")]
    UnsupportedFileExtension(String),
}

pub type FileFormatResult<T> = Result<T, FileExtensionError>;

#[derive(Debug, thiserror::Error)]
pub enum SerdeFormatError {
    #[error("YAML serialization failed")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}

pub type SerdeFormatResult<T> = Result<T, SerdeFormatError>;

/// Errors from [`read_from_file`].
#[derive(Debug, thiserror::Error)]
pub enum ReadFileError {
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Extension(#[from] FileExtensionError),
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        source: SerdeFormatError,
    },
}

pub fn get_file_extension(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|os_str| os_str.to_str())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn from_file_name(file_name: &str) -> FileFormatResult<Self> {
        let ext = get_file_extension(file_name).ok_or(FileExtensionError::MissingFileExtension)?;

        if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(FileExtensionError::UnsupportedFileExtension(
                file_name.to_string(),
            ))
        }
    }
}

pub fn serialize<T: Serialize>(value: &T, format: FileFormat) -> SerdeFormatResult<String> {
    match format {
        FileFormat::Yaml => Ok(serde_yml::to_string(value)?),
        FileFormat::Json => Ok(serde_json::to_string_pretty(value)?),
    }
}

pub fn deserialize<T: DeserializeOwned>(
    serialized: &str,
    format: FileFormat,
) -> SerdeFormatResult<T> {
    match format {
        FileFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        FileFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

/// Reads and deserializes a YAML or JSON file, picking the format from its extension.
pub fn read_from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ReadFileError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let format = FileFormat::from_file_name(&display)?;
    let text = std::fs::read_to_string(path).map_err(|source| ReadFileError::Io {
        path: display.clone(),
        source,
    })?;

    deserialize(&text, format).map_err(|source| ReadFileError::Parse {
        path: display,
        source,
    })
}
