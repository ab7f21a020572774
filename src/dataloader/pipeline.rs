use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::compute::device::ComputeDevice;
use crate::tensor::shape::Shape;
use crate::tensor::storage::Container;

use super::config::DatasetConfig;
use super::dataloader::DatasetSplit;
use super::error::{DataError, Result};
use super::idx::DatasetReader;
use super::sample_store::Dataset;

/// Serves image and one-hot label batches for both splits.
///
/// Each split has its own cursor. A batch is staged on the host, then moved to the
/// device in one transfer per container. The returned containers are reused by the
/// next call, which the `&mut self` receiver enforces.
pub struct BatchPipeline {
    dataset: Dataset,
    num_classes: usize,
    cursors: [usize; 2],
    images: Container,
    labels: Container,
    device: Arc<ComputeDevice>,
    shuffle: bool,
    shuffle_seed: u64,
    rng: StdRng,
}

impl BatchPipeline {
    /// Loads both splits from `config.data_dir`.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        let config = config.build()?;
        let dataset = DatasetReader::new(&config)?.load()?;
        Self::from_dataset(dataset, config)
    }

    /// Builds a pipeline around samples that are already in memory. Sample order is kept as given.
    pub fn from_dataset(dataset: Dataset, config: DatasetConfig) -> Result<Self> {
        let config = config.build()?;
        validate_dataset(&dataset, &config)?;

        let device = ComputeDevice::new(config.device, config.device_memory_limit)?;
        let shuffle_seed = config
            .shuffle_seed
            .unwrap_or_else(|| rand::thread_rng().gen());

        info!(
            train = dataset.train.len(),
            test = dataset.test.len(),
            height = dataset.height,
            width = dataset.width,
            device = ?config.device,
            shuffle_seed,
            "batch pipeline ready"
        );

        Ok(Self {
            num_classes: config.num_classes,
            cursors: [0; 2],
            images: Container::new(device.clone()),
            labels: Container::new(device.clone()),
            device,
            shuffle: config.shuffle,
            shuffle_seed,
            rng: StdRng::seed_from_u64(shuffle_seed),
            dataset,
        })
    }

    pub fn has_next(&self, split: DatasetSplit) -> bool {
        self.cursors[split.index()] < self.len(split)
    }

    /// Rewinds both splits. With `shuffle`, each split is permuted with its own freshly drawn seed.
    pub fn reset(&mut self, shuffle: bool) {
        self.cursors = [0; 2];

        if shuffle {
            for split in DatasetSplit::ALL {
                let seed: u64 = self.rng.gen();
                self.dataset
                    .split_mut(split)
                    .shuffle(&mut StdRng::seed_from_u64(seed));
                debug!(split = %split, seed, "shuffled split");
            }
        }
    }

    /// Starts a new epoch using the configured shuffle setting.
    pub fn next_epoch(&mut self) {
        self.reset(self.shuffle);
    }

    /// Stages the next `min(batch_size, remaining)` samples of `split`.
    ///
    /// Images come back as `[n, 1, height, width]`, labels as `[n, num_classes]` one-hot rows.
    pub fn next_batch(&mut self, batch_size: usize, split: DatasetSplit) -> Result<(&Container, &Container)> {
        if batch_size == 0 {
            return Err(DataError::InvalidBatchSize);
        }

        let store = self.dataset.split(split);
        let start = self.cursors[split.index()];
        if start >= store.len() {
            return Err(DataError::SplitExhausted(split));
        }
        let end = start.saturating_add(batch_size).min(store.len());
        let n = end - start;

        let image_shape = Shape::image_batch(n, 1, self.dataset.height, self.dataset.width)?;
        let label_shape = Shape::matrix(n, self.num_classes)?;
        self.images.ensure_shape(&image_shape)?;
        self.labels.ensure_shape(&label_shape)?;

        let window = &store.samples()[start..end];
        let pixels = self.dataset.height * self.dataset.width;

        let mut image_staging = self.device.staging_buffer(image_shape.num_elements())?;
        for (dst, sample) in image_staging.as_mut_slice().chunks_exact_mut(pixels).zip(window) {
            dst.copy_from_slice(&sample.pixels);
        }
        self.images.copy_from_staging(&image_staging)?;

        // Staging memory starts zeroed, which is the one-hot baseline
        let mut label_staging = self.device.staging_buffer(label_shape.num_elements())?;
        let one_hot = label_staging.as_mut_slice();
        for (row, sample) in window.iter().enumerate() {
            one_hot[label_shape.flatten(&[row, sample.label as usize])] = 1.0;
        }
        self.labels.copy_from_staging(&label_staging)?;

        self.cursors[split.index()] = end;
        Ok((&self.images, &self.labels))
    }

    pub fn len(&self, split: DatasetSplit) -> usize {
        self.dataset.split(split).len()
    }

    pub fn cursor(&self, split: DatasetSplit) -> usize {
        self.cursors[split.index()]
    }

    pub fn remaining(&self, split: DatasetSplit) -> usize {
        self.len(split).saturating_sub(self.cursor(split))
    }

    pub fn batches_remaining(&self, split: DatasetSplit, batch_size: usize) -> usize {
        if batch_size == 0 {
            return 0;
        }
        self.remaining(split).div_ceil(batch_size)
    }

    /// (height, width) of every image.
    pub fn image_dims(&self) -> (usize, usize) {
        (self.dataset.height, self.dataset.width)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle
    }

    pub fn shuffle_seed(&self) -> u64 {
        self.shuffle_seed
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn device(&self) -> &Arc<ComputeDevice> {
        &self.device
    }

    /// Containers holding the most recent batch.
    pub fn current_batch(&self) -> (&Container, &Container) {
        (&self.images, &self.labels)
    }
}

fn validate_dataset(dataset: &Dataset, config: &DatasetConfig) -> Result<()> {
    let pixels = dataset.pixels_per_image();
    if pixels == 0 {
        return Err(DataError::InvalidShape(vec![1, 1, dataset.height, dataset.width]));
    }

    for split in DatasetSplit::ALL {
        let store = dataset.split(split);
        if store.is_empty() {
            return Err(DataError::EmptyDataset {
                path: config.data_dir.join(split.images_file()),
            });
        }
        if let Some(bad) = store.images().find(|image| image.len() != pixels) {
            return Err(DataError::ShapeMismatch {
                op: "from_dataset",
                expected: vec![dataset.height, dataset.width],
                got: vec![bad.len()],
            });
        }
        store.check_labels(config.num_classes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataloader::sample_store::{Sample, SampleStore};

    fn dataset(train: usize, test: usize) -> Dataset {
        let store = |n: usize| {
            SampleStore::new(
                (0..n)
                    .map(|i| Sample {
                        pixels: vec![i as f32 / n as f32 - 0.5; 4].into_boxed_slice(),
                        label: (i % 10) as u8,
                    })
                    .collect(),
            )
        };
        Dataset::new(store(train), store(test), 2, 2)
    }

    fn config() -> DatasetConfig {
        DatasetConfig {
            shuffle: false,
            shuffle_seed: Some(42),
            threads: 1,
            ..DatasetConfig::new("unused")
        }
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut pipeline = BatchPipeline::from_dataset(dataset(3, 3), config()).unwrap();
        assert!(matches!(
            pipeline.next_batch(0, DatasetSplit::Train),
            Err(DataError::InvalidBatchSize)
        ));
        assert_eq!(pipeline.cursor(DatasetSplit::Train), 0);
    }

    #[test]
    fn exhausted_split_is_an_error_until_reset() {
        let mut pipeline = BatchPipeline::from_dataset(dataset(2, 1), config()).unwrap();
        pipeline.next_batch(5, DatasetSplit::Test).unwrap();
        assert!(!pipeline.has_next(DatasetSplit::Test));
        assert!(matches!(
            pipeline.next_batch(5, DatasetSplit::Test),
            Err(DataError::SplitExhausted(DatasetSplit::Test))
        ));

        pipeline.reset(false);
        assert!(pipeline.has_next(DatasetSplit::Test));
    }

    #[test]
    fn splits_advance_independently() {
        let mut pipeline = BatchPipeline::from_dataset(dataset(10, 4), config()).unwrap();
        pipeline.next_batch(3, DatasetSplit::Train).unwrap();
        pipeline.next_batch(3, DatasetSplit::Train).unwrap();
        pipeline.next_batch(3, DatasetSplit::Test).unwrap();

        assert_eq!(pipeline.cursor(DatasetSplit::Train), 6);
        assert_eq!(pipeline.cursor(DatasetSplit::Test), 3);
        assert_eq!(pipeline.batches_remaining(DatasetSplit::Train, 3), 2);
        assert_eq!(pipeline.batches_remaining(DatasetSplit::Test, 3), 1);
    }

    #[test]
    fn steady_batches_reuse_allocations() {
        let mut pipeline = BatchPipeline::from_dataset(dataset(10, 1), config()).unwrap();
        let ids = |p: &BatchPipeline| {
            let (images, labels) = p.current_batch();
            (images.allocation_id(), labels.allocation_id())
        };

        pipeline.next_batch(4, DatasetSplit::Train).unwrap();
        let first = ids(&pipeline);
        pipeline.next_batch(4, DatasetSplit::Train).unwrap();
        assert_eq!(ids(&pipeline), first);

        // last batch is short, so both containers shrink
        let (images, labels) = pipeline.next_batch(4, DatasetSplit::Train).unwrap();
        assert_eq!(images.shape().unwrap().as_slice(), &[2, 1, 2, 2]);
        assert_eq!(labels.shape().unwrap().as_slice(), &[2, 10]);
        assert_ne!(ids(&pipeline).0, first.0);
        assert_eq!(pipeline.device().allocation_count(), 4);
    }

    #[test]
    fn same_seed_gives_same_shuffle() {
        let mut a = BatchPipeline::from_dataset(dataset(20, 5), config()).unwrap();
        let mut b = BatchPipeline::from_dataset(dataset(20, 5), config()).unwrap();
        a.reset(true);
        b.reset(true);
        assert_eq!(
            a.dataset().train.labels().collect::<Vec<_>>(),
            b.dataset().train.labels().collect::<Vec<_>>()
        );
        assert_eq!(a.shuffle_seed(), 42);
    }

    #[test]
    fn rejects_inconsistent_in_memory_dataset() {
        let mut bad = dataset(3, 3);
        bad.test = SampleStore::default();
        assert!(matches!(
            BatchPipeline::from_dataset(bad, config()),
            Err(DataError::EmptyDataset { .. })
        ));

        let mut bad = dataset(3, 3);
        bad.width = 3;
        assert!(matches!(
            BatchPipeline::from_dataset(bad, config()),
            Err(DataError::ShapeMismatch { op: "from_dataset", .. })
        ));

        let config = DatasetConfig {
            num_classes: 5,
            ..config()
        };
        assert!(matches!(
            BatchPipeline::from_dataset(dataset(10, 1), config),
            Err(DataError::LabelOutOfRange { .. })
        ));
    }

    #[test]
    fn out_of_memory_surfaces_from_next_batch() {
        let config = DatasetConfig {
            device_memory_limit: Some(64),
            ..config()
        };
        let mut pipeline = BatchPipeline::from_dataset(dataset(10, 1), config).unwrap();
        assert!(matches!(
            pipeline.next_batch(8, DatasetSplit::Train),
            Err(DataError::OutOfMemory(_))
        ));
    }
}
