use thiserror::Error;

/// Fatal input problems. Nothing is restored when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RestoreError {
    #[error("Image has no pixels")]
    EmptyImage,

    #[error(
        "Depth map is {depth_width}x{depth_height} but image is {image_width}x{image_height}"
    )]
    ShapeMismatch {
        image_width: usize,
        image_height: usize,
        depth_width: usize,
        depth_height: usize,
    },

    #[error("Buffer holds {actual} values, expected {expected} for {width}x{height}x{channels}")]
    BufferLength {
        width: usize,
        height: usize,
        channels: usize,
        expected: usize,
        actual: usize,
    },
}

/// Errors that can occur when loading a [`Config`](crate::Config) from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Read(#[from] common::ReadFileError),
}
