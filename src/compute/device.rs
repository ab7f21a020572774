use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::dataloader::error::{DataError, Result};
use crate::tensor::shape::Shape;
use crate::tensor::tensor_data::TensorData;

#[cfg(feature = "cuda")]
use crate::gpu::cuda::CudaBackend;

use super::memory_tracker::MemoryTracker;
use super::staging::StagingBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceLocation {
    Cpu,
    Gpu(usize),
}

enum Backend {
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda(CudaBackend),
}

/// Owner of device memory for containers. Shared through an `Arc` by every container it allocates for.
pub struct ComputeDevice {
    location: DeviceLocation,
    backend: Backend,
    memory_tracking: Mutex<MemoryTracker>,
}

impl ComputeDevice {
    pub fn new(location: DeviceLocation, memory_limit_bytes: Option<u64>) -> Result<Arc<Self>> {
        match location {
            DeviceLocation::Cpu => Ok(Self::cpu(memory_limit_bytes)),
            #[cfg(feature = "cuda")]
            DeviceLocation::Gpu(ordinal) => Ok(Arc::new(Self {
                location,
                backend: Backend::Cuda(CudaBackend::new(ordinal)?),
                memory_tracking: Mutex::new(tracker_for(memory_limit_bytes)),
            })),
            #[cfg(not(feature = "cuda"))]
            DeviceLocation::Gpu(ordinal) => Err(DataError::InvalidConfig(format!(
                "GPU {ordinal} requested but this build has no `cuda` feature"
            ))),
        }
    }

    /// Host memory standing in for device memory, with an optional byte budget.
    pub fn cpu(memory_limit_bytes: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            location: DeviceLocation::Cpu,
            backend: Backend::Cpu,
            memory_tracking: Mutex::new(tracker_for(memory_limit_bytes)),
        })
    }

    pub fn location(&self) -> DeviceLocation {
        self.location
    }

    /// Zeroed buffer of `shape.num_elements()` floats.
    pub fn allocate(&self, shape: &Shape) -> Result<TensorData> {
        let bytes = shape.size_in_bytes() as u64;
        self.tracker().allocate(bytes).map_err(|err| match err {
            DataError::OutOfMemory(msg) => {
                DataError::OutOfMemory(format!("allocating {shape} on {:?}: {msg}", self.location))
            }
            other => other,
        })?;

        let data = match &self.backend {
            Backend::Cpu => Ok(TensorData::Cpu(vec![0.0; shape.num_elements()])),
            #[cfg(feature = "cuda")]
            Backend::Cuda(cuda) => cuda.alloc_zeros(shape.num_elements()).map(TensorData::Gpu),
        };

        let data = match data {
            Ok(data) => data,
            Err(err) => {
                self.tracker().deallocate(bytes);
                return Err(err);
            }
        };
        debug!(shape = %shape, bytes, "allocated device buffer");
        Ok(data)
    }

    pub fn release(&self, data: &TensorData) {
        if data.is_allocated() {
            self.tracker().deallocate(data.size_in_bytes() as u64);
        }
    }

    /// Host buffer for assembling one transfer. Page-locked when the device is a GPU.
    pub fn staging_buffer(&self, len: usize) -> Result<StagingBuffer> {
        match &self.backend {
            Backend::Cpu => Ok(StagingBuffer::pageable(len)),
            #[cfg(feature = "cuda")]
            Backend::Cuda(cuda) => cuda.alloc_pinned(len).map(StagingBuffer::pinned),
        }
    }

    pub fn upload(&self, src: &StagingBuffer, dst: &mut TensorData) -> Result<()> {
        if src.len() != dst.len() {
            return Err(DataError::ShapeMismatch {
                op: "upload",
                expected: vec![dst.len()],
                got: vec![src.len()],
            });
        }

        match (&self.backend, dst) {
            (Backend::Cpu, TensorData::Cpu(data)) => {
                data.copy_from_slice(src.as_slice());
                Ok(())
            }
            #[cfg(feature = "cuda")]
            (Backend::Cuda(cuda), TensorData::Gpu(slice)) => cuda.upload(src.as_slice(), slice),
            _ => Err(self.foreign_buffer("upload")),
        }
    }

    pub fn download(&self, src: &TensorData) -> Result<Vec<f32>> {
        match (&self.backend, src) {
            (_, TensorData::Unallocated) => Ok(Vec::new()),
            (Backend::Cpu, TensorData::Cpu(data)) => Ok(data.clone()),
            #[cfg(feature = "cuda")]
            (Backend::Cuda(cuda), TensorData::Gpu(slice)) => cuda.download(slice),
            #[cfg(feature = "cuda")]
            _ => Err(self.foreign_buffer("download")),
        }
    }

    pub fn fill_zeros(&self, dst: &mut TensorData) -> Result<()> {
        match (&self.backend, dst) {
            (_, TensorData::Unallocated) => Ok(()),
            (Backend::Cpu, TensorData::Cpu(data)) => {
                data.fill(0.0);
                Ok(())
            }
            #[cfg(feature = "cuda")]
            (Backend::Cuda(cuda), TensorData::Gpu(slice)) => cuda.memset_zeros(slice),
            #[cfg(feature = "cuda")]
            _ => Err(self.foreign_buffer("fill_zeros")),
        }
    }

    pub fn memory_in_use(&self) -> u64 {
        self.tracker().get_current()
    }

    pub fn peak_memory(&self) -> u64 {
        self.tracker().get_peak()
    }

    pub fn allocation_count(&self) -> u64 {
        self.tracker().get_allocations()
    }

    fn tracker(&self) -> MutexGuard<'_, MemoryTracker> {
        // Counters stay consistent even if a holder panicked
        self.memory_tracking
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn foreign_buffer(&self, op: &str) -> DataError {
        DataError::InvalidConfig(format!(
            "{op}: buffer was not allocated by the {:?} device",
            self.location
        ))
    }
}

fn tracker_for(memory_limit_bytes: Option<u64>) -> MemoryTracker {
    memory_limit_bytes
        .map(MemoryTracker::new)
        .unwrap_or_else(MemoryTracker::unlimited)
}
