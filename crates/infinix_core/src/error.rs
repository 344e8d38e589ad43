use crate::{device::Device, dtype::DType, op_type::OpType};
use infinix_rt::{rt_error_string, RT_SUCCESS};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    InvalidShape {
        message: String,
    },
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        msg: String,
    },
    DTypeMismatch {
        expected: DType,
        got: DType,
    },
    UnsupportedDType {
        dtype: DType,
        op: String,
    },
    InvalidDType(u32),
    InvalidArgument(String),
    //
    AlreadyAllocated {
        tensor: usize,
    },
    NotAllocated {
        tensor: usize,
    },
    DuplicateKernel {
        device: Device,
        op_type: OpType,
    },
    KernelNotFound {
        device: Device,
        op_type: OpType,
    },
    ContextNotInitialized,
    GraphNotSorted,
    InvalidGraph(String),
    // device runtime
    Runtime {
        code: i32,
        message: String,
    },
    Lock,
    Internal {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidShape { message } => write!(f, "Invalid shape: {}", message),
            Self::ShapeMismatch { expected, got, msg } => {
                write!(f, "Shape mismatch ({}): expected {:?}, got {:?}", msg, expected, got)
            }
            Self::DTypeMismatch { expected, got } => {
                write!(f, "DType mismatch: expected {}, got {}", expected, got)
            }
            Self::UnsupportedDType { dtype, op } => {
                write!(f, "Unsupported data type {} for {}", dtype, op)
            }
            Self::InvalidDType(tag) => write!(f, "Invalid dtype tag: {}", tag),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),

            Self::AlreadyAllocated { tensor } => {
                write!(f, "Tensor {} already has storage", tensor)
            }
            Self::NotAllocated { tensor } => write!(f, "Tensor {} has no storage", tensor),
            Self::DuplicateKernel { device, op_type } => {
                write!(f, "Kernel already registered for ({}, {})", device, op_type)
            }
            Self::KernelNotFound { device, op_type } => {
                write!(f, "No kernel registered for ({}, {})", device, op_type)
            }
            Self::ContextNotInitialized => write!(f, "Device context not initialized on this thread"),
            Self::GraphNotSorted => write!(f, "Graph is not topologically sorted"),
            Self::InvalidGraph(msg) => write!(f, "Invalid graph: {}", msg),
            Self::Runtime { code, message } => write!(f, "Runtime error {}: {}", code, message),
            Self::Lock => write!(f, "Lock poisoned"),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn from_rt(code: i32) -> Self {
        Self::Runtime {
            code,
            message: rt_error_string(code),
        }
    }
}

/// Maps an `infinix_rt` status code to a `Result`.
#[inline]
pub fn check_rt(code: i32) -> Result<()> {
    if code == RT_SUCCESS {
        Ok(())
    } else {
        Err(Error::from_rt(code))
    }
}
