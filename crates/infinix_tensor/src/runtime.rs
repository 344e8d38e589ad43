use crate::{
    graph::Graph,
    kernel::{KernelAttrs, KernelRegistry},
    kernels::register_builtin_kernels,
    operator::OpRef,
};
use dashmap::DashMap;
use infinix_core::{
    device::Device,
    error::{check_rt, Error, Result},
    rt::{self, RtStream, RT_DEVICE_TYPE_COUNT},
};
use std::{
    cell::RefCell,
    collections::HashMap,
    ffi::c_void,
    fmt, ptr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, Weak,
    },
    thread::{self, ThreadId},
};

// ────────────────────────────────────────────────────────────────────────────
//  Device helpers
// ────────────────────────────────────────────────────────────────────────────

/// Runs `f` with `device`/`device_id` selected on this thread, then restores
/// the previous selection.
pub(crate) fn on_device<F>(device: Device, device_id: usize, f: F) -> Result<i32>
where
    F: FnOnce() -> i32,
{
    let target = (device.code(), device_id as i32);
    let previous = rt::rt_current_device();
    if previous == target {
        return Ok(f());
    }
    check_rt(rt::rt_set_device(target.0, target.1))?;
    let status = f();
    check_rt(rt::rt_set_device(previous.0, previous.1))?;
    Ok(status)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemcpyKind {
    HostToHost,
    HostToDevice,
    DeviceToHost,
    DeviceToDevice,
}

impl MemcpyKind {
    pub fn code(&self) -> i32 {
        match self {
            MemcpyKind::HostToHost => rt::RT_MEMCPY_H2H,
            MemcpyKind::HostToDevice => rt::RT_MEMCPY_H2D,
            MemcpyKind::DeviceToHost => rt::RT_MEMCPY_D2H,
            MemcpyKind::DeviceToDevice => rt::RT_MEMCPY_D2D,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
//  Stream / Context
// ────────────────────────────────────────────────────────────────────────────

/// An ordered device work queue. Destroyed when dropped.
pub struct Stream {
    raw: RtStream,
    device: Device,
    device_id: usize,
}

// The runtime's streams are safe to enqueue on from any thread.
unsafe impl Send for Stream {}
unsafe impl Sync for Stream {}

impl Stream {
    /// Creates a stream on the device currently selected on this thread.
    pub fn create() -> Result<Self> {
        let (device, device_id) = Runtime::current_device()?;
        let mut raw: RtStream = ptr::null_mut();
        check_rt(unsafe { rt::rt_stream_create(&mut raw) })?;
        Ok(Self { raw, device, device_id })
    }

    pub fn raw(&self) -> RtStream {
        self.raw
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    /// Enqueues a host callback behind all work already on the stream.
    pub fn launch<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let raw = self.raw;
        let status = on_device(self.device, self.device_id, || unsafe { rt::rt_launch_host_func(raw, Box::new(f)) })?;
        check_rt(status)
    }

    pub fn synchronize(&self) -> Result<()> {
        let raw = self.raw;
        let status = on_device(self.device, self.device_id, || unsafe { rt::rt_stream_synchronize(raw) })?;
        check_rt(status)
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        let raw = self.raw;
        let status = on_device(self.device, self.device_id, || unsafe { rt::rt_stream_destroy(raw) });
        if let Err(e) = status.and_then(check_rt) {
            log::warn!("failed to destroy stream {:p}: {}", raw, e);
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream({:p} on {}:{})", self.raw, self.device, self.device_id)
    }
}

/// A thread's device selection and its dedicated stream.
#[derive(Debug, Clone)]
pub struct Context {
    device: Device,
    device_id: usize,
    stream: Arc<Stream>,
}

impl Context {
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Whether both handles refer to the same context.
    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.stream, &other.stream)
    }
}

// ────────────────────────────────────────────────────────────────────────────
//  Runtime
// ────────────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuntimeId(usize);
static RUNTIME_COUNTER: AtomicUsize = AtomicUsize::new(1);
#[inline]
fn next_runtime_id() -> RuntimeId {
    RuntimeId(RUNTIME_COUNTER.fetch_add(1, Ordering::SeqCst))
}

static BUILTINS_REGISTERED: Mutex<bool> = Mutex::new(false);

/// Thread-local view of a context. The runtime's map owns the stream.
struct CachedContext {
    device: Device,
    device_id: usize,
    stream: Weak<Stream>,
}

impl CachedContext {
    fn upgrade(&self) -> Option<Context> {
        self.stream.upgrade().map(|stream| Context {
            device: self.device,
            device_id: self.device_id,
            stream,
        })
    }
}

thread_local! {
    static THREAD_CONTEXTS: RefCell<HashMap<RuntimeId, CachedContext>> = RefCell::new(HashMap::new());
}

/// Owns per-thread device contexts and dispatches graphs to kernels. Dropping
/// the runtime destroys the streams of every context not held elsewhere.
pub struct Runtime {
    id: RuntimeId,
    registry: Arc<KernelRegistry>,
    contexts: DashMap<ThreadId, Context>,
}

impl Runtime {
    /// Initializes the device runtime and registers the built-in kernels in
    /// the global registry. Later calls do nothing.
    pub fn init() -> Result<()> {
        check_rt(rt::rt_init())?;
        let mut registered = BUILTINS_REGISTERED.lock().map_err(|_| Error::Lock)?;
        if !*registered {
            let registry = KernelRegistry::global();
            register_builtin_kernels(&registry)?;
            *registered = true;
            log::info!("runtime initialized with {} kernels", registry.len());
        }
        Ok(())
    }

    /// Number of devices of every kind.
    pub fn all_device_count() -> Result<Vec<(Device, usize)>> {
        let mut counts = [0i32; RT_DEVICE_TYPE_COUNT];
        check_rt(rt::rt_get_all_device_count(&mut counts))?;
        Ok(Device::ALL
            .iter()
            .map(|&d| (d, counts[d.code() as usize].max(0) as usize))
            .collect())
    }

    /// Device selected on the calling thread.
    pub fn current_device() -> Result<(Device, usize)> {
        let (code, id) = rt::rt_current_device();
        let device = Device::from_code(code).ok_or_else(|| Error::Internal {
            message: format!("unknown device code {}", code),
        })?;
        Ok((device, id as usize))
    }

    /// A runtime backed by the global kernel registry.
    pub fn new() -> Arc<Self> {
        Self::with_registry(KernelRegistry::global())
    }

    pub fn with_registry(registry: Arc<KernelRegistry>) -> Arc<Self> {
        Arc::new(Self {
            id: next_runtime_id(),
            registry,
            contexts: DashMap::new(),
        })
    }

    pub fn id(&self) -> RuntimeId {
        self.id
    }

    pub fn registry(&self) -> &Arc<KernelRegistry> {
        &self.registry
    }

    // ────────────────────────────────────────────────────────────────────────
    //  Thread contexts
    // ────────────────────────────────────────────────────────────────────────

    /// Selects the device on this thread and gives the thread its own stream.
    /// On a thread that already has a context this returns that context.
    pub fn init_thread_context(&self, device: Device, device_id: usize) -> Result<Context> {
        if let Ok(ctx) = self.current_thread_context() {
            return Ok(ctx);
        }
        check_rt(rt::rt_set_device(device.code(), device_id as i32))?;
        let ctx = Context {
            device,
            device_id,
            stream: Arc::new(Stream::create()?),
        };
        THREAD_CONTEXTS.with(|c| {
            let mut contexts = c.borrow_mut();
            contexts.retain(|_, cached| cached.stream.strong_count() > 0);
            contexts.insert(
                self.id,
                CachedContext {
                    device,
                    device_id,
                    stream: Arc::downgrade(&ctx.stream),
                },
            );
        });
        let thread = thread::current();
        self.contexts.insert(thread.id(), ctx.clone());
        log::info!(
            "thread {:?} ({}) bound to {}:{}",
            thread.id(),
            thread.name().unwrap_or("unnamed"),
            device,
            device_id
        );
        Ok(ctx)
    }

    pub fn current_thread_context(&self) -> Result<Context> {
        THREAD_CONTEXTS
            .with(|c| c.borrow().get(&self.id).and_then(CachedContext::upgrade))
            .ok_or(Error::ContextNotInitialized)
    }

    /// Switches the device selected on this thread. The thread's context is
    /// left as it is.
    pub fn set_current_device(&self, device: Device, device_id: usize) -> Result<()> {
        check_rt(rt::rt_set_device(device.code(), device_id as i32))
    }

    /// Every thread context created through this runtime.
    pub fn thread_contexts(&self) -> Vec<(ThreadId, Context)> {
        self.contexts.iter().map(|e| (*e.key(), e.value().clone())).collect()
    }

    // ────────────────────────────────────────────────────────────────────────
    //  Memory
    // ────────────────────────────────────────────────────────────────────────

    pub fn alloc_host(&self, size: usize) -> Result<*mut c_void> {
        let mut ptr: *mut c_void = ptr::null_mut();
        check_rt(unsafe { rt::rt_malloc_host(&mut ptr, size) })?;
        Ok(ptr)
    }

    pub fn alloc_device(&self, size: usize) -> Result<*mut c_void> {
        let mut ptr: *mut c_void = ptr::null_mut();
        check_rt(unsafe { rt::rt_malloc(&mut ptr, size) })?;
        Ok(ptr)
    }

    /// # Safety
    ///
    /// `ptr` must come from `alloc_host` and must not be used afterwards.
    pub unsafe fn dealloc_host(&self, ptr: *mut c_void) -> Result<()> {
        check_rt(rt::rt_free_host(ptr))
    }

    /// # Safety
    ///
    /// `ptr` must come from `alloc_device` on the current device and must not
    /// be used afterwards.
    pub unsafe fn dealloc_device(&self, ptr: *mut c_void) -> Result<()> {
        check_rt(rt::rt_free(ptr))
    }

    /// # Safety
    ///
    /// `dst` and `src` must be valid for `size` bytes in the memory spaces
    /// named by `kind` and must not overlap.
    pub unsafe fn memcpy(&self, dst: *mut c_void, src: *const c_void, size: usize, kind: MemcpyKind) -> Result<()> {
        check_rt(rt::rt_memcpy(dst, src, size, kind.code()))
    }

    /// # Safety
    ///
    /// As `memcpy`, and both regions must stay valid until `stream` has run
    /// the copy.
    pub unsafe fn memcpy_async(
        &self,
        dst: *mut c_void,
        src: *const c_void,
        size: usize,
        kind: MemcpyKind,
        stream: &Stream,
    ) -> Result<()> {
        check_rt(rt::rt_memcpy_async(dst, src, size, kind.code(), stream.raw()))
    }

    pub fn malloc_async(&self, size: usize, stream: &Stream) -> Result<*mut c_void> {
        let mut ptr: *mut c_void = ptr::null_mut();
        check_rt(unsafe { rt::rt_malloc_async(&mut ptr, size, stream.raw()) })?;
        Ok(ptr)
    }

    /// # Safety
    ///
    /// `ptr` must come from `alloc_device` or `malloc_async` and must not be
    /// touched by work ordered after this call.
    pub unsafe fn free_async(&self, ptr: *mut c_void, stream: &Stream) -> Result<()> {
        check_rt(rt::rt_free_async(ptr, stream.raw()))
    }

    /// Blocks until all work on this thread's device has completed.
    pub fn synchronize(&self) -> Result<()> {
        check_rt(rt::rt_device_synchronize())
    }

    // ────────────────────────────────────────────────────────────────────────
    //  Execution
    // ────────────────────────────────────────────────────────────────────────

    /// Dispatches every operator of a sorted `graph`, in its stored order, on
    /// this thread's context.
    pub fn run(&self, graph: &Graph) -> Result<()> {
        let ctx = self.current_thread_context()?;
        self.run_with(&ctx, graph)
    }

    /// Like `run`, on an explicit context. The graph must be sorted.
    pub fn run_with(&self, ctx: &Context, graph: &Graph) -> Result<()> {
        if !graph.is_sorted() {
            return Err(Error::GraphNotSorted);
        }
        let selected = (ctx.device.code(), ctx.device_id as i32);
        if rt::rt_current_device() != selected {
            check_rt(rt::rt_set_device(selected.0, selected.1))?;
        }
        for op in graph.operators() {
            let attrs = KernelAttrs::new(ctx.device, op.op_type());
            let kernel = self.registry.get_kernel(&attrs)?;
            log::debug!("dispatching operator {} as {}", op.id(), attrs);
            kernel.compute(OpRef::new(op, graph), ctx.stream())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("contexts", &self.contexts.len())
            .field("kernels", &self.registry.len())
            .finish()
    }
}
