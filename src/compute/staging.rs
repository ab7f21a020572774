#[cfg(feature = "cuda")]
use crate::gpu::cuda::PinnedHostBuffer;

enum StagingMemory {
    Pageable(Vec<f32>),
    #[cfg(feature = "cuda")]
    Pinned(PinnedHostBuffer),
}

/// Zero-initialized host buffer a batch is assembled in before its single transfer to the device.
pub struct StagingBuffer {
    memory: StagingMemory,
}

impl StagingBuffer {
    pub fn pageable(len: usize) -> Self {
        Self {
            memory: StagingMemory::Pageable(vec![0.0; len]),
        }
    }

    #[cfg(feature = "cuda")]
    pub fn pinned(buffer: PinnedHostBuffer) -> Self {
        Self {
            memory: StagingMemory::Pinned(buffer),
        }
    }

    pub fn is_pinned(&self) -> bool {
        match &self.memory {
            StagingMemory::Pageable(_) => false,
            #[cfg(feature = "cuda")]
            StagingMemory::Pinned(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        match &self.memory {
            StagingMemory::Pageable(data) => data.as_slice(),
            #[cfg(feature = "cuda")]
            StagingMemory::Pinned(buffer) => buffer.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        match &mut self.memory {
            StagingMemory::Pageable(data) => data.as_mut_slice(),
            #[cfg(feature = "cuda")]
            StagingMemory::Pinned(buffer) => buffer.as_mut_slice(),
        }
    }
}
