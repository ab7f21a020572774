use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Arc;

use cudarc::driver::{result, CudaDevice, CudaSlice, DriverError};

use crate::dataloader::error::{DataError, Result};

fn driver(op: &'static str) -> impl FnOnce(DriverError) -> DataError {
    move |source| DataError::Device { op, source }
}

/// Thin wrapper over a cudarc device. Every call is synchronous on the device's default stream.
pub struct CudaBackend {
    device: Arc<CudaDevice>,
}

impl CudaBackend {
    pub fn new(ordinal: usize) -> Result<Self> {
        let device = CudaDevice::new(ordinal).map_err(driver("cuDeviceGet"))?;
        Ok(Self { device })
    }

    pub fn alloc_zeros(&self, len: usize) -> Result<CudaSlice<f32>> {
        self.device.alloc_zeros::<f32>(len).map_err(driver("cuMemAlloc"))
    }

    pub fn memset_zeros(&self, dst: &mut CudaSlice<f32>) -> Result<()> {
        self.device.memset_zeros(dst).map_err(driver("cuMemsetD8"))
    }

    pub fn upload(&self, src: &[f32], dst: &mut CudaSlice<f32>) -> Result<()> {
        self.device
            .htod_sync_copy_into(src, dst)
            .map_err(driver("cuMemcpyHtoD"))
    }

    pub fn download(&self, src: &CudaSlice<f32>) -> Result<Vec<f32>> {
        self.device.dtoh_sync_copy(src).map_err(driver("cuMemcpyDtoH"))
    }

    /// Page-locked host memory of `len` zeroed floats.
    pub fn alloc_pinned(&self, len: usize) -> Result<PinnedHostBuffer> {
        self.device.bind_to_thread().map_err(driver("cuCtxSetCurrent"))?;

        let bytes = len.max(1) * std::mem::size_of::<f32>();
        let raw = unsafe { result::malloc_host(bytes, 0) }.map_err(driver("cuMemHostAlloc"))?;
        let ptr = NonNull::new(raw as *mut f32)
            .ok_or_else(|| DataError::OutOfMemory(format!("cuMemHostAlloc returned null for {bytes} bytes")))?;

        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, len) };

        Ok(PinnedHostBuffer {
            ptr,
            len,
            device: self.device.clone(),
        })
    }
}

pub struct PinnedHostBuffer {
    ptr: NonNull<f32>,
    len: usize,
    device: Arc<CudaDevice>,
}

// The allocation is owned exclusively by this value.
unsafe impl Send for PinnedHostBuffer {}

impl PinnedHostBuffer {
    pub fn as_slice(&self) -> &[f32] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for PinnedHostBuffer {
    fn drop(&mut self) {
        if let Err(err) = self.device.bind_to_thread() {
            let bytes = self.len * std::mem::size_of::<f32>();
            tracing::warn!("cuCtxSetCurrent failed, leaking {bytes} pinned bytes: {err}");
            return;
        }
        if let Err(err) = unsafe { result::free_host(self.ptr.as_ptr() as *mut c_void) } {
            tracing::warn!("cuMemFreeHost failed: {err}");
        }
    }
}
