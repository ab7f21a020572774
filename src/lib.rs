//! Loads IDX image/label archives and serves shape-tagged, device-resident
//! batches for a training loop.
//!
//! ```no_run
//! use gpu_dataset::{BatchPipeline, DatasetConfig, DatasetSplit};
//!
//! let mut pipeline = BatchPipeline::new(DatasetConfig::new("data/mnist"))?;
//! pipeline.next_epoch();
//! while pipeline.has_next(DatasetSplit::Train) {
//!     let (images, labels) = pipeline.next_batch(64, DatasetSplit::Train)?;
//!     // images: [n, 1, 28, 28], labels: [n, 10]
//!     # let _ = (images, labels);
//! }
//! # Ok::<(), gpu_dataset::DataError>(())
//! ```

pub mod compute;
pub mod dataloader;
pub mod gpu;
pub mod tensor;

pub use compute::device::{ComputeDevice, DeviceLocation};
pub use dataloader::config::DatasetConfig;
pub use dataloader::dataloader::DatasetSplit;
pub use dataloader::error::{DataError, Result};
pub use dataloader::pipeline::BatchPipeline;
pub use tensor::shape::Shape;
pub use tensor::storage::Container;
