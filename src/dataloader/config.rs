use std::path::PathBuf;

use crate::compute::device::DeviceLocation;

use super::error::{DataError, Result};

pub struct DatasetConfig {
    pub data_dir: PathBuf,
    pub shuffle: bool,
    pub shuffle_seed: Option<u64>,
    pub num_classes: usize,
    pub threads: usize,
    pub device: DeviceLocation,
    pub device_memory_limit: Option<u64>,
}

impl DatasetConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn build(self) -> Result<Self> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(DataError::InvalidConfig("data_dir is empty".into()));
        }
        if self.num_classes == 0 || self.num_classes > u8::MAX as usize + 1 {
            return Err(DataError::InvalidConfig(format!(
                "num_classes must be in 1..=256, got {}",
                self.num_classes
            )));
        }
        if self.threads == 0 {
            return Err(DataError::InvalidConfig("threads must be at least 1".into()));
        }

        Ok(self)
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            shuffle: true,
            shuffle_seed: None,
            num_classes: 10,
            threads: num_cpus::get(),
            device: DeviceLocation::Cpu,
            device_memory_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = DatasetConfig::new("/tmp/mnist").build().unwrap();
        assert_eq!(config.num_classes, 10);
        assert!(config.shuffle);
        assert!(config.threads >= 1);
    }

    #[test]
    fn rejects_zero_classes_and_threads() {
        let config = DatasetConfig {
            num_classes: 0,
            ..DatasetConfig::new("x")
        };
        assert!(matches!(config.build(), Err(DataError::InvalidConfig(_))));

        let config = DatasetConfig {
            threads: 0,
            ..DatasetConfig::new("x")
        };
        assert!(matches!(config.build(), Err(DataError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_data_dir() {
        assert!(DatasetConfig::new("").build().is_err());
    }
}
