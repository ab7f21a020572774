use std::path::PathBuf;

use thiserror::Error;

use super::dataloader::DatasetSplit;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    // IO and archive errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No samples found, expected archive at {}", .path.display())]
    EmptyDataset { path: PathBuf },

    #[error("Invalid magic number in {}: expected {expected}, got {got}", .path.display())]
    InvalidMagic {
        path: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("Archive {} truncated: expected {expected} bytes, got {got}", .path.display())]
    Truncated {
        path: PathBuf,
        expected: usize,
        got: usize,
    },

    #[error("{split} split has {images} images but {labels} labels")]
    CountMismatch {
        split: DatasetSplit,
        images: usize,
        labels: usize,
    },

    #[error("Label {label} at index {index} is outside 0..{num_classes}")]
    LabelOutOfRange {
        index: usize,
        label: u8,
        num_classes: usize,
    },

    #[error("Train images are {train:?} but test images are {test:?}")]
    DimensionMismatch {
        train: (usize, usize),
        test: (usize, usize),
    },

    // Shape and batching errors
    #[error("Invalid shape {0:?}: needs at least one dimension and no zero entries")]
    InvalidShape(Vec<usize>),

    #[error("Shape mismatch in {op}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("{0} split is exhausted, call reset() to start a new epoch")]
    SplitExhausted(DatasetSplit),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    // Device errors
    #[error("Out of memory error: {0}")]
    OutOfMemory(String),

    #[cfg(feature = "cuda")]
    #[error("CUDA driver error during {op}: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: cudarc::driver::DriverError,
    },
}
