// IDX archive reader
//
// images: magic(2051) | count | rows | cols | count*rows*cols u8 pixels
// labels: magic(2049) | count | count u8 labels
// Header fields are big-endian u32.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::config::DatasetConfig;
use super::dataloader::{DatasetSplit, IMAGE_MAGIC, LABEL_MAGIC};
use super::error::{DataError, Result};
use super::sample_store::{Dataset, SampleStore};

const IMAGE_HEADER_BYTES: usize = 16;
const LABEL_HEADER_BYTES: usize = 8;

#[inline]
pub fn normalize_pixel(value: u8) -> f32 {
    value as f32 / 255.0 - 0.5
}

#[derive(Debug, Default)]
pub struct ImageArchive {
    pub samples: Vec<Box<[f32]>>,
    pub height: usize,
    pub width: usize,
}

impl ImageArchive {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

pub struct DatasetReader {
    data_dir: PathBuf,
    num_classes: usize,
    pool: rayon::ThreadPool,
}

impl DatasetReader {
    pub fn new(config: &DatasetConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("idx-normalize-{i}"))
            .build()?;

        Ok(Self {
            data_dir: config.data_dir.clone(),
            num_classes: config.num_classes,
            pool,
        })
    }

    /// Reads and normalizes an image archive. A file that cannot be opened gives an empty archive.
    pub fn read_images(&self, path: &Path) -> Result<ImageArchive> {
        let Some(bytes) = read_archive(path)? else {
            return Ok(ImageArchive::default());
        };

        let [magic, count, rows, cols] = read_header::<4>(&bytes, path)?;
        debug!(path = %path.display(), magic, count, rows, cols, "image archive header");
        check_magic(path, IMAGE_MAGIC, magic)?;

        let (count, rows, cols) = (count as usize, rows as usize, cols as usize);
        let pixels_per_image = rows * cols;
        let raw = payload(&bytes, path, IMAGE_HEADER_BYTES, count.checked_mul(pixels_per_image))?;

        if count == 0 {
            return Ok(ImageArchive {
                samples: Vec::new(),
                height: rows,
                width: cols,
            });
        }
        if pixels_per_image == 0 {
            return Err(DataError::InvalidShape(vec![count, 1, rows, cols]));
        }

        let samples = self.pool.install(|| {
            raw.par_chunks_exact(pixels_per_image)
                .map(|image| image.iter().copied().map(normalize_pixel).collect::<Box<[f32]>>())
                .collect::<Vec<_>>()
        });

        Ok(ImageArchive {
            samples,
            height: rows,
            width: cols,
        })
    }

    /// Reads a label archive. A file that cannot be opened gives no labels.
    pub fn read_labels(&self, path: &Path) -> Result<Vec<u8>> {
        let Some(bytes) = read_archive(path)? else {
            return Ok(Vec::new());
        };

        let [magic, count] = read_header::<2>(&bytes, path)?;
        debug!(path = %path.display(), magic, count, "label archive header");
        check_magic(path, LABEL_MAGIC, magic)?;

        let labels = payload(&bytes, path, LABEL_HEADER_BYTES, Some(count as usize))?;
        Ok(labels.to_vec())
    }

    /// Loads one split. Missing or empty archives are an error naming the expected path.
    pub fn load_split(&self, split: DatasetSplit) -> Result<(SampleStore, (usize, usize))> {
        let (images_path, labels_path) = split.archive_paths(&self.data_dir);

        let images = self.read_images(&images_path)?;
        if images.is_empty() {
            return Err(DataError::EmptyDataset { path: images_path });
        }
        let labels = self.read_labels(&labels_path)?;
        if labels.is_empty() {
            return Err(DataError::EmptyDataset { path: labels_path });
        }

        let dims = (images.height, images.width);
        let store = SampleStore::from_parts(split, images.samples, labels)?;
        store.check_labels(self.num_classes)?;

        info!(
            split = %split,
            samples = store.len(),
            height = dims.0,
            width = dims.1,
            "loaded split"
        );
        Ok((store, dims))
    }

    pub fn load(&self) -> Result<Dataset> {
        let (train, train_dims) = self.load_split(DatasetSplit::Train)?;
        let (test, test_dims) = self.load_split(DatasetSplit::Test)?;

        if train_dims != test_dims {
            return Err(DataError::DimensionMismatch {
                train: train_dims,
                test: test_dims,
            });
        }

        Ok(Dataset::new(train, test, train_dims.0, train_dims.1))
    }
}

fn read_archive(path: &Path) -> Result<Option<Vec<u8>>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(path = %path.display(), "cannot open archive: {err}");
            return Ok(None);
        }
    };

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn read_header<const N: usize>(bytes: &[u8], path: &Path) -> Result<[u32; N]> {
    if bytes.len() < N * 4 {
        return Err(DataError::Truncated {
            path: path.to_owned(),
            expected: N * 4,
            got: bytes.len(),
        });
    }

    let mut header = [0u32; N];
    for (field, chunk) in header.iter_mut().zip(bytes.chunks_exact(4)) {
        *field = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(header)
}

fn check_magic(path: &Path, expected: u32, got: u32) -> Result<()> {
    if expected != got {
        return Err(DataError::InvalidMagic {
            path: path.to_owned(),
            expected,
            got,
        });
    }
    Ok(())
}

fn payload<'a>(bytes: &'a [u8], path: &Path, header: usize, len: Option<usize>) -> Result<&'a [u8]> {
    let end = len.and_then(|len| len.checked_add(header));
    match end {
        Some(end) if end <= bytes.len() => Ok(&bytes[header..end]),
        _ => Err(DataError::Truncated {
            path: path.to_owned(),
            expected: end.unwrap_or(usize::MAX),
            got: bytes.len(),
        }),
    }
}
