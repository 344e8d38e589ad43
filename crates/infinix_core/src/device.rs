use infinix_rt::{RT_DEVICE_CPU, RT_DEVICE_CUDA};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device kind. Together with a device id it names one physical device; the id
/// lives in the thread's device context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Device {
    CPU,
    CUDA,
}

impl Device {
    pub const ALL: [Device; 2] = [Device::CPU, Device::CUDA];

    pub fn name(&self) -> &'static str {
        match self {
            Device::CPU => "CPU",
            Device::CUDA => "CUDA",
        }
    }

    /// Device code understood by `infinix_rt`.
    pub fn code(&self) -> i32 {
        match self {
            Device::CPU => RT_DEVICE_CPU,
            Device::CUDA => RT_DEVICE_CUDA,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            RT_DEVICE_CPU => Some(Device::CPU),
            RT_DEVICE_CUDA => Some(Device::CUDA),
            _ => None,
        }
    }

    /// The most capable device kind compiled into this build.
    pub fn default_available() -> Self {
        #[cfg(feature = "cuda")]
        return Device::CUDA;
        #[cfg(not(feature = "cuda"))]
        Device::CPU
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
