use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::compute::device::ComputeDevice;
use crate::compute::staging::StagingBuffer;
use crate::dataloader::error::{DataError, Result};

use super::shape::Shape;
use super::tensor_data::TensorData;

// 0 is reserved for "never allocated"
static NEXT_ALLOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A device buffer tagged with the shape it is laid out in.
///
/// The buffer is (re)allocated lazily by [`Container::ensure_shape`] and only when the
/// requested shape differs from the current one, so a steady stream of equally sized
/// batches reuses one allocation. Contents are not preserved across a shape change.
pub struct Container {
    shape: Option<Shape>,
    data: TensorData,
    allocation_id: u64,
    device: Arc<ComputeDevice>,
}

impl Container {
    pub fn new(device: Arc<ComputeDevice>) -> Self {
        Self {
            shape: None,
            data: TensorData::Unallocated,
            allocation_id: 0,
            device,
        }
    }

    pub fn with_shape(device: Arc<ComputeDevice>, shape: Shape) -> Result<Self> {
        let mut container = Self::new(device);
        container.ensure_shape(&shape)?;
        Ok(container)
    }

    /// Makes the buffer hold exactly `shape.num_elements()` floats laid out as `shape`.
    ///
    /// Returns `true` when a new buffer was allocated, `false` when the shape already matched.
    pub fn ensure_shape(&mut self, shape: &Shape) -> Result<bool> {
        if self.shape.as_ref() == Some(shape) {
            return Ok(false);
        }

        if let Some(old) = &self.shape {
            debug!(from = %old, to = %shape, "resizing container");
        }

        // Free first so the old and new buffers never coexist on the device
        let old = std::mem::replace(&mut self.data, TensorData::Unallocated);
        self.device.release(&old);
        drop(old);
        self.shape = None;

        self.data = self.device.allocate(shape)?;
        self.shape = Some(shape.clone());
        self.allocation_id = NEXT_ALLOCATION_ID.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn device(&self) -> &Arc<ComputeDevice> {
        &self.device
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_allocated()
    }

    pub fn num_elements(&self) -> usize {
        self.shape.as_ref().map_or(0, Shape::num_elements)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data.size_in_bytes()
    }

    /// Identity of the current buffer. Changes on every reallocation, 0 before the first one.
    pub fn allocation_id(&self) -> u64 {
        self.allocation_id
    }

    /// Rejects callers holding a stale idea of this container's layout.
    pub fn expect_shape(&self, expected: &Shape) -> Result<()> {
        match &self.shape {
            Some(shape) if shape == expected => Ok(()),
            current => Err(DataError::ShapeMismatch {
                op: "expect_shape",
                expected: expected.as_slice().to_vec(),
                got: current.as_ref().map(|s| s.as_slice().to_vec()).unwrap_or_default(),
            }),
        }
    }

    /// One bulk host to device copy of a fully assembled staging buffer.
    pub fn copy_from_staging(&mut self, staging: &StagingBuffer) -> Result<()> {
        let shape = self.shape.as_ref().ok_or_else(|| DataError::ShapeMismatch {
            op: "copy_from_staging",
            expected: Vec::new(),
            got: vec![staging.len()],
        })?;
        if staging.len() != shape.num_elements() {
            return Err(DataError::ShapeMismatch {
                op: "copy_from_staging",
                expected: shape.as_slice().to_vec(),
                got: vec![staging.len()],
            });
        }
        self.device.upload(staging, &mut self.data)
    }

    pub fn fill_zeros(&mut self) -> Result<()> {
        self.device.fill_zeros(&mut self.data)
    }

    /// Reads the buffer back into host memory.
    pub fn to_host(&self) -> Result<Vec<f32>> {
        self.device.download(&self.data)
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.device.release(&self.data);
    }
}
