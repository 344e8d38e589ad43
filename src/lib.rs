//! Tensor graph execution core.
//!
//! Build a [`Graph`](tensor::Graph) of tensors and operators, sort and
//! shape-infer it, allocate its storage, then hand it to a
//! [`Runtime`](tensor::Runtime) which dispatches each operator to the kernel
//! registered for the thread's device.

pub mod prelude;

pub use infinix_core as core;
pub use infinix_core::rt;
pub use infinix_tensor as tensor;

pub use infinix_core::dtype::{bfloat16, bool, float16, float32, float64, half, int32, int64, int8, uint32, uint8};
pub use infinix_core::error::{Error, Result};

use infinix_core::device::Device;
use infinix_tensor::{Context, Runtime};
use std::sync::Arc;

/// Initializes the device runtime and built-in kernels, creates a runtime on
/// the global registry and binds the calling thread to the default device.
pub fn init() -> Result<(Arc<Runtime>, Context)> {
    Runtime::init()?;
    let runtime = Runtime::new();
    let device = Device::default_available();
    let ctx = runtime.init_thread_context(device, 0)?;
    log::info!("infinix ready on {}", device);
    Ok((runtime, ctx))
}
