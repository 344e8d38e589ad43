#![allow(non_snake_case)]

use crate::{HostFn, RtStream, RT_ERROR_CUDA_BASE, RT_SUCCESS};
use std::ffi::{c_char, c_void, CStr};

#[link(name = "cudart")]
extern "C" {
    fn cudaFree(ptr: *mut c_void) -> i32;
    fn cudaMalloc(ptr: *mut *mut c_void, size: usize) -> i32;
    fn cudaFreeHost(ptr: *mut c_void) -> i32;
    fn cudaMallocHost(ptr: *mut *mut c_void, size: usize) -> i32;
    fn cudaMemcpy(dst: *mut c_void, src: *const c_void, count: usize, kind: i32) -> i32;
    fn cudaMemcpyAsync(dst: *mut c_void, src: *const c_void, count: usize, kind: i32, stream: *mut c_void) -> i32;
    fn cudaMallocAsync(ptr: *mut *mut c_void, size: usize, stream: *mut c_void) -> i32;
    fn cudaFreeAsync(ptr: *mut c_void, stream: *mut c_void) -> i32;
    fn cudaGetErrorString(error: i32) -> *const c_char;
    fn cudaGetDeviceCount(count: *mut i32) -> i32;
    fn cudaSetDevice(device: i32) -> i32;
    fn cudaDeviceSynchronize() -> i32;
    fn cudaStreamCreate(stream: *mut *mut c_void) -> i32;
    fn cudaStreamDestroy(stream: *mut c_void) -> i32;
    fn cudaStreamSynchronize(stream: *mut c_void) -> i32;
    fn cudaLaunchHostFunc(stream: *mut c_void, func: extern "C" fn(*mut c_void), user_data: *mut c_void) -> i32;
}

#[inline]
fn status(code: i32) -> i32 {
    if code == 0 {
        RT_SUCCESS
    } else {
        RT_ERROR_CUDA_BASE + code
    }
}

pub(crate) fn init() -> i32 {
    // cudaFree(null) forces lazy context creation.
    unsafe { status(cudaFree(std::ptr::null_mut())) }
}

pub(crate) fn device_count(count: &mut i32) -> i32 {
    unsafe { status(cudaGetDeviceCount(count)) }
}

pub(crate) fn set_device(device_id: i32) -> i32 {
    unsafe { status(cudaSetDevice(device_id)) }
}

pub(crate) unsafe fn stream_create(stream: *mut RtStream) -> i32 {
    status(cudaStreamCreate(stream))
}

pub(crate) unsafe fn stream_destroy(stream: RtStream) -> i32 {
    status(cudaStreamDestroy(stream))
}

pub(crate) unsafe fn stream_synchronize(stream: RtStream) -> i32 {
    status(cudaStreamSynchronize(stream))
}

pub(crate) fn device_synchronize() -> i32 {
    unsafe { status(cudaDeviceSynchronize()) }
}

pub(crate) unsafe fn malloc(ptr: *mut *mut c_void, size: usize) -> i32 {
    status(cudaMalloc(ptr, size))
}

pub(crate) unsafe fn free(ptr: *mut c_void) -> i32 {
    status(cudaFree(ptr))
}

pub(crate) unsafe fn malloc_host(ptr: *mut *mut c_void, size: usize) -> i32 {
    status(cudaMallocHost(ptr, size))
}

pub(crate) unsafe fn free_host(ptr: *mut c_void) -> i32 {
    status(cudaFreeHost(ptr))
}

pub(crate) unsafe fn memcpy(dst: *mut c_void, src: *const c_void, size: usize, kind: i32) -> i32 {
    status(cudaMemcpy(dst, src, size, kind))
}

pub(crate) unsafe fn memcpy_async(dst: *mut c_void, src: *const c_void, size: usize, kind: i32, stream: RtStream) -> i32 {
    status(cudaMemcpyAsync(dst, src, size, kind, stream))
}

pub(crate) unsafe fn malloc_async(ptr: *mut *mut c_void, size: usize, stream: RtStream) -> i32 {
    status(cudaMallocAsync(ptr, size, stream))
}

pub(crate) unsafe fn free_async(ptr: *mut c_void, stream: RtStream) -> i32 {
    status(cudaFreeAsync(ptr, stream))
}

extern "C" fn host_trampoline(user_data: *mut c_void) {
    let func = unsafe { Box::from_raw(user_data as *mut HostFn) };
    func();
}

pub(crate) unsafe fn launch_host_func(stream: RtStream, func: HostFn) -> i32 {
    let user_data = Box::into_raw(Box::new(func)) as *mut c_void;
    let code = cudaLaunchHostFunc(stream, host_trampoline, user_data);
    if code != 0 {
        drop(Box::from_raw(user_data as *mut HostFn));
    }
    status(code)
}

pub(crate) fn error_string(error_code: i32) -> String {
    unsafe {
        let c_str = cudaGetErrorString(error_code);
        if c_str.is_null() {
            format!("Unknown CUDA error: {}", error_code)
        } else {
            CStr::from_ptr(c_str).to_string_lossy().into_owned()
        }
    }
}
