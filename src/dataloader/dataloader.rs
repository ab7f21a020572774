use std::fmt;
use std::path::{Path, PathBuf};

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DatasetSplit {
    Train,
    Test,
}

impl DatasetSplit {
    pub const ALL: [DatasetSplit; 2] = [DatasetSplit::Train, DatasetSplit::Test];

    pub fn index(self) -> usize {
        match self {
            DatasetSplit::Train => 0,
            DatasetSplit::Test => 1,
        }
    }

    pub fn images_file(self) -> &'static str {
        match self {
            DatasetSplit::Train => "train-images-idx3-ubyte",
            DatasetSplit::Test => "t10k-images-idx3-ubyte",
        }
    }

    pub fn labels_file(self) -> &'static str {
        match self {
            DatasetSplit::Train => "train-labels-idx1-ubyte",
            DatasetSplit::Test => "t10k-labels-idx1-ubyte",
        }
    }

    /// (images, labels) archive paths for this split under `root`.
    pub fn archive_paths(self, root: &Path) -> (PathBuf, PathBuf) {
        (root.join(self.images_file()), root.join(self.labels_file()))
    }
}

impl fmt::Display for DatasetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSplit::Train => write!(f, "train"),
            DatasetSplit::Test => write!(f, "test"),
        }
    }
}
