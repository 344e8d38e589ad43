//! Built-in kernels and their bootstrap registration.

pub mod cpu;

use crate::kernel::KernelRegistry;
use infinix_core::error::Result;

/// Registers every built-in kernel table into `registry`. Registering twice
/// into the same registry fails with `DuplicateKernel`.
pub fn register_builtin_kernels(registry: &KernelRegistry) -> Result<()> {
    registry.register_entries(cpu::CPU_KERNELS)?;
    log::debug!("registered {} cpu kernels", cpu::CPU_KERNELS.len());
    Ok(())
}
