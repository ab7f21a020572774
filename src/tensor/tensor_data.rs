#[cfg(feature = "cuda")]
use cudarc::driver::CudaSlice;

/// Backing buffer of a container, resident on whichever device allocated it.
#[derive(Debug)]
pub enum TensorData {
    Unallocated,
    Cpu(Vec<f32>),
    #[cfg(feature = "cuda")]
    Gpu(CudaSlice<f32>),
}

impl TensorData {
    pub fn len(&self) -> usize {
        match self {
            TensorData::Unallocated => 0,
            TensorData::Cpu(data) => data.len(),
            #[cfg(feature = "cuda")]
            TensorData::Gpu(slice) => slice.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_allocated(&self) -> bool {
        !matches!(self, TensorData::Unallocated)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }

    /// Direct view of the buffer when it lives in host memory.
    pub fn as_host(&self) -> Option<&[f32]> {
        match self {
            TensorData::Cpu(data) => Some(data.as_slice()),
            _ => None,
        }
    }
}
