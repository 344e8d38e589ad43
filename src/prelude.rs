pub use crate::core::{
    device::Device,
    dtype::{DType, HostElement},
    error::{Error, Result},
    op_type::OpType,
};
pub use crate::tensor::{
    ops::{BinaryOp, MatMulOp, UnaryOp},
    Context, Graph, Kernel, KernelAttrs, KernelRegistry, OpDef, OpId, OpRef, Runtime, Stream, Tensor, TensorId,
};
pub use ::half::{bf16, f16};
