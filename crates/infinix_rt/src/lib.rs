mod cpu;
#[cfg(feature = "cuda")]
mod cuda;

use std::{
    cell::Cell,
    ffi::c_void,
    sync::atomic::{AtomicBool, Ordering},
};

pub const RT_SUCCESS: i32 = 0;
pub const RT_ERROR_INVALID_ARGUMENT: i32 = 1;
pub const RT_ERROR_OUT_OF_MEMORY: i32 = 2;
pub const RT_ERROR_NOT_INITIALIZED: i32 = 3;
pub const RT_ERROR_INVALID_DEVICE: i32 = 4;
pub const RT_ERROR_DEVICE_NOT_SUPPORTED: i32 = 5;
pub const RT_ERROR_INVALID_STREAM: i32 = 6;
pub const RT_ERROR_LAUNCH_FAILED: i32 = 7;
/// CUDA status codes are reported as `RT_ERROR_CUDA_BASE + cudaError_t`.
pub const RT_ERROR_CUDA_BASE: i32 = 1000;

pub const RT_DEVICE_CPU: i32 = 0;
pub const RT_DEVICE_CUDA: i32 = 1;
pub const RT_DEVICE_TYPE_COUNT: usize = 2;

pub const RT_MEMCPY_H2H: i32 = 0;
pub const RT_MEMCPY_H2D: i32 = 1;
pub const RT_MEMCPY_D2H: i32 = 2;
pub const RT_MEMCPY_D2D: i32 = 3;

/// Opaque stream handle. A null stream is the default stream: work issued on it
/// completes before the call returns.
pub type RtStream = *mut c_void;

/// Host callback enqueued on a stream.
pub type HostFn = Box<dyn FnOnce() + Send + 'static>;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static CURRENT_DEVICE: Cell<(i32, i32)> = const { Cell::new((RT_DEVICE_CPU, 0)) };
}

macro_rules! ensure_init {
    () => {
        if !INITIALIZED.load(Ordering::Acquire) {
            return RT_ERROR_NOT_INITIALIZED;
        }
    };
}

macro_rules! dispatch {
    (cpu => $cpu:expr, cuda => $cuda:expr) => {{
        ensure_init!();
        match rt_current_device().0 {
            RT_DEVICE_CPU => $cpu,
            #[cfg(feature = "cuda")]
            RT_DEVICE_CUDA => $cuda,
            #[cfg(not(feature = "cuda"))]
            RT_DEVICE_CUDA => RT_ERROR_DEVICE_NOT_SUPPORTED,
            _ => RT_ERROR_INVALID_DEVICE,
        }
    }};
}

/// Initializes the device runtime. Safe to call more than once.
pub fn rt_init() -> i32 {
    #[cfg(feature = "cuda")]
    {
        let status = cuda::init();
        if status != RT_SUCCESS {
            return status;
        }
    }
    INITIALIZED.store(true, Ordering::Release);
    RT_SUCCESS
}

pub fn rt_is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Writes the number of devices of every kind into `count_array`, indexed by
/// device code.
pub fn rt_get_all_device_count(count_array: &mut [i32]) -> i32 {
    ensure_init!();
    if count_array.len() < RT_DEVICE_TYPE_COUNT {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    count_array[RT_DEVICE_CPU as usize] = 1;
    count_array[RT_DEVICE_CUDA as usize] = 0;
    #[cfg(feature = "cuda")]
    {
        let mut count = 0;
        let status = cuda::device_count(&mut count);
        if status != RT_SUCCESS {
            return status;
        }
        count_array[RT_DEVICE_CUDA as usize] = count;
    }
    RT_SUCCESS
}

/// Selects the device used by subsequent calls on this thread.
pub fn rt_set_device(device: i32, device_id: i32) -> i32 {
    ensure_init!();
    let status = match device {
        RT_DEVICE_CPU => {
            if device_id == 0 {
                RT_SUCCESS
            } else {
                RT_ERROR_INVALID_DEVICE
            }
        }
        #[cfg(feature = "cuda")]
        RT_DEVICE_CUDA => cuda::set_device(device_id),
        #[cfg(not(feature = "cuda"))]
        RT_DEVICE_CUDA => RT_ERROR_DEVICE_NOT_SUPPORTED,
        _ => RT_ERROR_INVALID_DEVICE,
    };
    if status == RT_SUCCESS {
        CURRENT_DEVICE.with(|d| d.set((device, device_id)));
    }
    status
}

/// # Safety
///
/// `device` and `device_id` must be valid for writes.
pub unsafe fn rt_get_device(device: *mut i32, device_id: *mut i32) -> i32 {
    if device.is_null() || device_id.is_null() {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    let (kind, id) = rt_current_device();
    *device = kind;
    *device_id = id;
    RT_SUCCESS
}

/// Device kind and id selected on the calling thread.
pub fn rt_current_device() -> (i32, i32) {
    CURRENT_DEVICE.with(|d| d.get())
}

/// # Safety
///
/// * `stream` must be valid for writes
/// * The stream must be released with `rt_stream_destroy`
pub unsafe fn rt_stream_create(stream: *mut RtStream) -> i32 {
    if stream.is_null() {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    dispatch!(cpu => cpu::stream_create(stream), cuda => cuda::stream_create(stream))
}

/// # Safety
///
/// * `stream` must have been created by `rt_stream_create` on the current device kind
/// * The stream must not be used after being destroyed
pub unsafe fn rt_stream_destroy(stream: RtStream) -> i32 {
    dispatch!(cpu => cpu::stream_destroy(stream), cuda => cuda::stream_destroy(stream))
}

/// # Safety
///
/// `stream` must be null or a live stream created by `rt_stream_create`.
pub unsafe fn rt_stream_synchronize(stream: RtStream) -> i32 {
    dispatch!(cpu => cpu::stream_synchronize(stream), cuda => cuda::stream_synchronize(stream))
}

/// Blocks until every stream of the current device has drained.
pub fn rt_device_synchronize() -> i32 {
    dispatch!(cpu => cpu::device_synchronize(), cuda => cuda::device_synchronize())
}

/// # Safety
///
/// * `ptr` must be valid for writes
/// * The returned memory must be released with `rt_free`
pub unsafe fn rt_malloc(ptr: *mut *mut c_void, size: usize) -> i32 {
    if ptr.is_null() {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    dispatch!(cpu => cpu::malloc(ptr, size), cuda => cuda::malloc(ptr, size))
}

/// # Safety
///
/// * `ptr` must have been allocated by `rt_malloc` on the current device kind
/// * The pointer must not be used after being freed
pub unsafe fn rt_free(ptr: *mut c_void) -> i32 {
    dispatch!(cpu => cpu::free(ptr), cuda => cuda::free(ptr))
}

/// # Safety
///
/// * `ptr` must be valid for writes
/// * The returned memory must be released with `rt_free_host`
pub unsafe fn rt_malloc_host(ptr: *mut *mut c_void, size: usize) -> i32 {
    if ptr.is_null() {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    dispatch!(cpu => cpu::malloc(ptr, size), cuda => cuda::malloc_host(ptr, size))
}

/// # Safety
///
/// `ptr` must have been allocated by `rt_malloc_host` and not freed yet.
pub unsafe fn rt_free_host(ptr: *mut c_void) -> i32 {
    dispatch!(cpu => cpu::free(ptr), cuda => cuda::free_host(ptr))
}

/// # Safety
///
/// * `dst` and `src` must be valid for `size` bytes in the memory spaces named by `kind`
/// * The memory regions must not overlap
pub unsafe fn rt_memcpy(dst: *mut c_void, src: *const c_void, size: usize, kind: i32) -> i32 {
    if !(RT_MEMCPY_H2H..=RT_MEMCPY_D2D).contains(&kind) {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    dispatch!(cpu => cpu::memcpy(dst, src, size), cuda => cuda::memcpy(dst, src, size, kind))
}

/// # Safety
///
/// Same requirements as `rt_memcpy`, and both regions must stay valid until the
/// stream has executed the copy.
pub unsafe fn rt_memcpy_async(dst: *mut c_void, src: *const c_void, size: usize, kind: i32, stream: RtStream) -> i32 {
    if !(RT_MEMCPY_H2H..=RT_MEMCPY_D2D).contains(&kind) {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    dispatch!(
        cpu => cpu::memcpy_async(dst, src, size, stream),
        cuda => cuda::memcpy_async(dst, src, size, kind, stream)
    )
}

/// # Safety
///
/// * `ptr` must be valid for writes
/// * The memory may only be touched by work ordered after this call on `stream`
pub unsafe fn rt_malloc_async(ptr: *mut *mut c_void, size: usize, stream: RtStream) -> i32 {
    if ptr.is_null() {
        return RT_ERROR_INVALID_ARGUMENT;
    }
    dispatch!(cpu => cpu::malloc_async(ptr, size, stream), cuda => cuda::malloc_async(ptr, size, stream))
}

/// # Safety
///
/// `ptr` must come from `rt_malloc`/`rt_malloc_async` and must not be used by work
/// ordered after this call.
pub unsafe fn rt_free_async(ptr: *mut c_void, stream: RtStream) -> i32 {
    dispatch!(cpu => cpu::free_async(ptr, stream), cuda => cuda::free_async(ptr, stream))
}

/// Enqueues a host callback on `stream`. It runs after all previously enqueued
/// work on that stream.
///
/// # Safety
///
/// `stream` must be null or a live stream created by `rt_stream_create`.
pub unsafe fn rt_launch_host_func(stream: RtStream, func: HostFn) -> i32 {
    dispatch!(cpu => cpu::launch_host_func(stream, func), cuda => cuda::launch_host_func(stream, func))
}

/// Converts a status code into a human-readable message.
pub fn rt_error_string(code: i32) -> String {
    match code {
        RT_SUCCESS => "no error".to_string(),
        RT_ERROR_INVALID_ARGUMENT => "invalid argument".to_string(),
        RT_ERROR_OUT_OF_MEMORY => "out of memory".to_string(),
        RT_ERROR_NOT_INITIALIZED => "device runtime not initialized".to_string(),
        RT_ERROR_INVALID_DEVICE => "invalid device".to_string(),
        RT_ERROR_DEVICE_NOT_SUPPORTED => "device kind not supported by this build".to_string(),
        RT_ERROR_INVALID_STREAM => "invalid stream".to_string(),
        RT_ERROR_LAUNCH_FAILED => "work enqueued on the stream failed".to_string(),
        #[cfg(feature = "cuda")]
        c if c >= RT_ERROR_CUDA_BASE => cuda::error_string(c - RT_ERROR_CUDA_BASE),
        c => format!("Unknown runtime error: {}", c),
    }
}
