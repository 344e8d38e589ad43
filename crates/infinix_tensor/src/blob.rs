use crate::runtime::{on_device, Runtime};
use infinix_core::{
    device::Device,
    error::{check_rt, Result},
    rt::rt_free,
};
use std::{ffi::c_void, fmt, sync::Arc};

/// Shared handle to one device allocation.
pub type Blob = Arc<BlobObject>;

/// A device pointer together with the runtime and device that own it. The
/// memory is released when the last handle drops.
pub struct BlobObject {
    runtime: Arc<Runtime>,
    ptr: *mut c_void,
    size: usize,
    device: Device,
    device_id: usize,
}

// The pointer is only dereferenced by work issued through the runtime.
unsafe impl Send for BlobObject {}
unsafe impl Sync for BlobObject {}

impl BlobObject {
    /// Allocates `size` bytes on the calling thread's current device.
    pub fn alloc(runtime: &Arc<Runtime>, size: usize) -> Result<Blob> {
        let (device, device_id) = Runtime::current_device()?;
        let ptr = runtime.alloc_device(size)?;
        log::debug!("allocated {} bytes on {}:{} at {:p}", size, device, device_id, ptr);
        Ok(Arc::new(Self {
            runtime: Arc::clone(runtime),
            ptr,
            size,
            device,
            device_id,
        }))
    }

    /// Takes ownership of memory obtained from `Runtime::alloc_device`.
    ///
    /// # Safety
    ///
    /// `ptr` must have been allocated on `device`/`device_id` with at least
    /// `size` bytes, and must not be freed by anyone else.
    pub unsafe fn from_raw(
        runtime: Arc<Runtime>,
        ptr: *mut c_void,
        size: usize,
        device: Device,
        device_id: usize,
    ) -> Blob {
        Arc::new(Self {
            runtime,
            ptr,
            size,
            device,
            device_id,
        })
    }

    pub fn ptr(&self) -> *mut c_void {
        self.ptr
    }

    pub fn as_ptr<T>(&self) -> *mut T {
        self.ptr as *mut T
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

impl Drop for BlobObject {
    fn drop(&mut self) {
        let ptr = self.ptr;
        let status = on_device(self.device, self.device_id, || unsafe { rt_free(ptr) });
        if let Err(e) = status.and_then(check_rt) {
            log::warn!("failed to free {} bytes at {:p}: {}", self.size, ptr, e);
        }
    }
}

impl fmt::Debug for BlobObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobObject")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("device", &self.device)
            .field("device_id", &self.device_id)
            .finish()
    }
}
