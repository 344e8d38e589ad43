pub mod blob;
pub mod graph;
pub mod kernel;
pub mod kernels;
pub mod operator;
pub mod ops;
pub mod runtime;
pub mod tensor;

pub use blob::{Blob, BlobObject};
pub use graph::Graph;
pub use kernel::{Kernel, KernelAttrs, KernelEntry, KernelRecord, KernelRegistry};
pub use operator::{OpDef, OpId, OpRef, Operator};
pub use runtime::{Context, MemcpyKind, Runtime, Stream};
pub use tensor::{Fuid, Tensor, TensorId};
