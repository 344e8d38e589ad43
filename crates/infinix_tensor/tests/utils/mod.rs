#![allow(dead_code)]

use infinix_core::{device::Device, error::Result};
use infinix_tensor::{Context, KernelRegistry, Runtime};
use std::sync::Arc;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Runtime on the global registry with a CPU context on the calling thread.
pub fn setup() -> Result<(Arc<Runtime>, Context)> {
    init_logger();
    Runtime::init()?;
    let runtime = Runtime::new();
    let ctx = runtime.init_thread_context(Device::CPU, 0)?;
    Ok((runtime, ctx))
}

pub fn setup_with_registry(registry: Arc<KernelRegistry>) -> Result<(Arc<Runtime>, Context)> {
    init_logger();
    Runtime::init()?;
    let runtime = Runtime::with_registry(registry);
    let ctx = runtime.init_thread_context(Device::CPU, 0)?;
    Ok((runtime, ctx))
}
