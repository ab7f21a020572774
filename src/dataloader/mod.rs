pub mod config;
pub mod dataloader;
pub mod error;
pub mod idx;
pub mod info;
pub mod pipeline;
pub mod sample_store;
