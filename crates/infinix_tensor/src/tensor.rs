use crate::{
    blob::{Blob, BlobObject},
    operator::OpId,
    runtime::{MemcpyKind, Runtime},
};
use infinix_core::{
    dtype::{DType, HostElement},
    error::{Error, Result},
    layout::Layout,
};
use std::{
    ffi::c_void,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

// ────────────────────────────────────────────────────────────────────────────
//  Ids
// ────────────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(usize);
static TENSOR_COUNTER: AtomicUsize = AtomicUsize::new(100);
#[inline]
pub(crate) fn next_tensor_id() -> TensorId {
    TensorId(TENSOR_COUNTER.fetch_add(1, Ordering::SeqCst))
}

impl TensorId {
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Functional id: shared by tensors that denote the same logical value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fuid(usize);
static FUID_COUNTER: AtomicUsize = AtomicUsize::new(1);
#[inline]
pub(crate) fn next_fuid() -> Fuid {
    Fuid(FUID_COUNTER.fetch_add(1, Ordering::SeqCst))
}

impl Fuid {
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Fuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
//  Tensor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Tensor {
    id: TensorId,
    fuid: Fuid,
    dtype: DType,
    layout: Layout,
    data: Option<Blob>,
    source: Option<OpId>,
    targets: Vec<OpId>,
}

impl Tensor {
    /// A tensor with row-major contiguous strides.
    pub fn new(shape: &[usize], dtype: DType) -> Result<Self> {
        Ok(Self::from_layout(Layout::from_shape(shape)?, dtype))
    }

    pub fn with_stride(shape: &[usize], stride: &[isize], dtype: DType) -> Result<Self> {
        Ok(Self::from_layout(Layout::new(shape, stride)?, dtype))
    }

    fn from_layout(layout: Layout, dtype: DType) -> Self {
        Self {
            id: next_tensor_id(),
            fuid: next_fuid(),
            dtype,
            layout,
            data: None,
            source: None,
            targets: Vec::new(),
        }
    }

    /// Same functional id, shape, stride and dtype under a new id, without
    /// storage or graph links.
    pub fn duplicate(&self) -> Self {
        Self {
            id: next_tensor_id(),
            fuid: self.fuid,
            dtype: self.dtype,
            layout: self.layout.clone(),
            data: None,
            source: None,
            targets: Vec::new(),
        }
    }

    pub fn id(&self) -> TensorId {
        self.id
    }
    pub fn fuid(&self) -> Fuid {
        self.fuid
    }
    pub fn dtype(&self) -> DType {
        self.dtype
    }
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }
    pub fn stride(&self) -> &[isize] {
        self.layout.stride()
    }
    pub fn rank(&self) -> usize {
        self.layout.ndim()
    }
    /// Number of logical elements.
    pub fn size(&self) -> usize {
        self.layout.size()
    }
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Element slots the storage must provide for every index to be valid.
    pub fn storage_size(&self) -> usize {
        self.layout.storage_size()
    }

    pub fn bytes(&self) -> usize {
        self.storage_size() * self.dtype.size_in_bytes()
    }

    /// Element offset of index `[0, .., 0]` within the storage.
    pub fn origin_offset(&self) -> usize {
        self.layout.origin_offset()
    }

    /// Resets the stride to row-major contiguous for the new shape.
    pub fn set_shape(&mut self, shape: &[usize]) -> Result<()> {
        let mut layout = self.layout.clone();
        layout.set_shape(shape)?;
        self.check_capacity(&layout)?;
        self.layout = layout;
        Ok(())
    }

    pub fn set_stride(&mut self, stride: &[isize]) -> Result<()> {
        let mut layout = self.layout.clone();
        layout.set_stride(stride)?;
        self.check_capacity(&layout)?;
        self.layout = layout;
        Ok(())
    }

    fn check_capacity(&self, layout: &Layout) -> Result<()> {
        if let Some(blob) = &self.data {
            let needed = layout.storage_size() * self.dtype.size_in_bytes();
            if needed > blob.size() {
                return Err(Error::InvalidShape {
                    message: format!(
                        "tensor {} needs {} bytes for shape {:?} but its storage holds {}",
                        self.id,
                        needed,
                        layout.shape(),
                        blob.size()
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn data(&self) -> Option<&Blob> {
        self.data.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// The bound storage, or `NotAllocated`.
    pub fn blob(&self) -> Result<&Blob> {
        self.data.as_ref().ok_or(Error::NotAllocated { tensor: self.id.0 })
    }

    /// Allocates exactly `bytes()` bytes on the current device.
    pub fn data_malloc(&mut self, runtime: &Arc<Runtime>) -> Result<()> {
        if self.data.is_some() {
            return Err(Error::AlreadyAllocated { tensor: self.id.0 });
        }
        self.data = Some(BlobObject::alloc(runtime, self.bytes())?);
        Ok(())
    }

    /// Binds storage allocated elsewhere. It must hold at least `bytes()`
    /// and `blob` must be its only handle, so no two tensors share storage.
    pub fn bind_data(&mut self, mut blob: Blob) -> Result<()> {
        if self.data.is_some() {
            return Err(Error::AlreadyAllocated { tensor: self.id.0 });
        }
        if Arc::get_mut(&mut blob).is_none() {
            return Err(Error::InvalidArgument(format!(
                "blob at {:p} is shared and cannot back tensor {}",
                blob.ptr(),
                self.id
            )));
        }
        if blob.size() < self.bytes() {
            return Err(Error::InvalidArgument(format!(
                "blob of {} bytes is too small for tensor {} ({} bytes)",
                blob.size(),
                self.id,
                self.bytes()
            )));
        }
        self.data = Some(blob);
        Ok(())
    }

    /// Copies `src` over the whole storage. `src` is laid out as the raw
    /// storage, so it must hold `storage_size()` elements.
    pub fn copy_from_host<T: HostElement>(&self, runtime: &Runtime, src: &[T]) -> Result<()> {
        self.check_host_transfer::<T>(src.len())?;
        let blob = self.blob()?;
        unsafe {
            runtime.memcpy(
                blob.ptr(),
                src.as_ptr() as *const c_void,
                self.bytes(),
                MemcpyKind::HostToDevice,
            )
        }
    }

    /// Reads the raw storage back. Pending work on the stream is not waited for.
    pub fn copy_to_host<T: HostElement>(&self, runtime: &Runtime) -> Result<Vec<T>> {
        let len = self.storage_size();
        self.check_host_transfer::<T>(len)?;
        let blob = self.blob()?;
        let mut out = vec![T::zeroed(); len];
        unsafe {
            runtime.memcpy(
                out.as_mut_ptr() as *mut c_void,
                blob.ptr(),
                self.bytes(),
                MemcpyKind::DeviceToHost,
            )?;
        }
        Ok(out)
    }

    fn check_host_transfer<T: HostElement>(&self, len: usize) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                expected: self.dtype,
                got: T::DTYPE,
            });
        }
        if len != self.storage_size() {
            return Err(Error::ShapeMismatch {
                expected: vec![self.storage_size()],
                got: vec![len],
                msg: format!("host buffer for tensor {}", self.id),
            });
        }
        Ok(())
    }

    pub fn source(&self) -> Option<OpId> {
        self.source
    }

    pub fn targets(&self) -> &[OpId] {
        &self.targets
    }

    pub(crate) fn add_target(&mut self, op: OpId) {
        self.targets.push(op);
    }

    pub(crate) fn set_source(&mut self, op: OpId) {
        self.source = Some(op);
    }

    /// Drops every occurrence of `op` from the consumer list.
    pub(crate) fn remove_target(&mut self, op: OpId) {
        self.targets.retain(|&t| t != op);
    }

    pub(crate) fn clear_source(&mut self) {
        self.source = None;
    }

    pub(crate) fn clear_links(&mut self) {
        self.source = None;
        self.targets.clear();
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor {}, Fuid {}, shape {:?}, stride {:?}, dtype {}, ",
            self.id,
            self.fuid,
            self.shape(),
            self.stride(),
            self.dtype
        )?;
        match &self.data {
            Some(blob) => write!(f, "{:p}", blob.ptr())?,
            None => write!(f, "no data")?,
        }
        match self.source {
            Some(op) => write!(f, ", source {}", op)?,
            None => write!(f, ", source None")?,
        }
        let targets: Vec<usize> = self.targets.iter().map(|t| t.raw()).collect();
        write!(f, ", targets {:?}", targets)
    }
}
