use rand::seq::SliceRandom;
use rand::Rng;

use super::dataloader::DatasetSplit;
use super::error::{DataError, Result};

/// One normalized image together with its class label.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub pixels: Box<[f32]>,
    pub label: u8,
}

/// All samples of one split. Images and labels are kept as combined records so a
/// permutation can never pair an image with another sample's label.
#[derive(Clone, Debug, Default)]
pub struct SampleStore {
    samples: Vec<Sample>,
}

impl SampleStore {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Zips parallel image and label sequences, which must have equal length.
    pub fn from_parts(split: DatasetSplit, images: Vec<Box<[f32]>>, labels: Vec<u8>) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(DataError::CountMismatch {
                split,
                images: images.len(),
                labels: labels.len(),
            });
        }

        let samples = images
            .into_iter()
            .zip(labels)
            .map(|(pixels, label)| Sample { pixels, label })
            .collect();
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn images(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.samples.iter().map(|s| &*s.pixels)
    }

    pub fn labels(&self) -> impl Iterator<Item = u8> + '_ {
        self.samples.iter().map(|s| s.label)
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.samples.shuffle(rng);
    }

    pub(crate) fn check_labels(&self, num_classes: usize) -> Result<()> {
        match self
            .samples
            .iter()
            .enumerate()
            .find(|(_, s)| s.label as usize >= num_classes)
        {
            Some((index, sample)) => Err(DataError::LabelOutOfRange {
                index,
                label: sample.label,
                num_classes,
            }),
            None => Ok(()),
        }
    }
}

/// Both splits of an image classification dataset plus the shared image size.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub train: SampleStore,
    pub test: SampleStore,
    pub height: usize,
    pub width: usize,
}

impl Dataset {
    pub fn new(train: SampleStore, test: SampleStore, height: usize, width: usize) -> Self {
        Self {
            train,
            test,
            height,
            width,
        }
    }

    pub fn split(&self, split: DatasetSplit) -> &SampleStore {
        match split {
            DatasetSplit::Train => &self.train,
            DatasetSplit::Test => &self.test,
        }
    }

    pub fn split_mut(&mut self, split: DatasetSplit) -> &mut SampleStore {
        match split {
            DatasetSplit::Train => &mut self.train,
            DatasetSplit::Test => &mut self.test,
        }
    }

    pub fn pixels_per_image(&self) -> usize {
        self.height * self.width
    }
}
