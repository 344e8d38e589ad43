use crate::{
    blob::Blob,
    kernel::Kernel,
    operator::OpRef,
    register_kernels,
    runtime::Stream,
    tensor::Tensor,
};
use half::{bf16, f16};
use infinix_core::{
    device::Device,
    dtype::DType,
    error::{Error, Result},
    layout::broadcast_stride,
    op_type::OpType,
};
use infinix_cpu::ops::{binary::*, matmul::*, unary::*};
use std::sync::Arc;

register_kernels!(CPU_KERNELS: [
    (Device::CPU, OpType::Add) => BinaryKernel(OpType::Add), "cpu_add";
    (Device::CPU, OpType::Sub) => BinaryKernel(OpType::Sub), "cpu_sub";
    (Device::CPU, OpType::Mul) => BinaryKernel(OpType::Mul), "cpu_mul";
    (Device::CPU, OpType::Div) => BinaryKernel(OpType::Div), "cpu_div";
    (Device::CPU, OpType::Relu) => UnaryKernel(OpType::Relu), "cpu_relu";
    (Device::CPU, OpType::Neg) => UnaryKernel(OpType::Neg), "cpu_neg";
    (Device::CPU, OpType::Abs) => UnaryKernel(OpType::Abs), "cpu_abs";
    (Device::CPU, OpType::Sigmoid) => UnaryKernel(OpType::Sigmoid), "cpu_sigmoid";
    (Device::CPU, OpType::Identity) => UnaryKernel(OpType::Identity), "cpu_identity";
    (Device::CPU, OpType::MatMul) => MatMulKernel, "cpu_matmul";
]);

type UnaryFn<T> = unsafe fn(usize, usize, *const usize, *const isize, *const usize, *const T, *mut T);
type BinaryFn<T> = unsafe fn(usize, usize, *const usize, *const isize, *const usize, *const T, *const T, *mut T);
type MatMulFn<T> =
    unsafe fn(usize, *const usize, usize, usize, usize, *const isize, *const usize, *const T, *const T, *mut T);

/// Everything an element-wise routine needs, owned so it can move onto the
/// stream. `buffers` holds the inputs followed by the output and keeps them
/// alive until the work has run.
struct StridedLaunch {
    num_els: usize,
    dims: Vec<usize>,
    strides: Vec<isize>,
    offsets: Vec<usize>,
    buffers: Vec<Blob>,
}

impl StridedLaunch {
    fn new(inputs: &[&Tensor], out: &Tensor) -> Result<Self> {
        let dims = out.shape().to_vec();
        let mut strides = Vec::with_capacity(dims.len() * (inputs.len() + 1));
        let mut offsets = Vec::with_capacity(inputs.len() + 1);
        let mut buffers = Vec::with_capacity(inputs.len() + 1);
        for input in inputs {
            strides.extend(broadcast_stride(input.shape(), input.stride(), &dims)?);
            offsets.push(input.origin_offset());
            buffers.push(Arc::clone(input.blob()?));
        }
        strides.extend_from_slice(out.stride());
        offsets.push(out.origin_offset());
        buffers.push(Arc::clone(out.blob()?));
        Ok(Self {
            num_els: out.size(),
            dims,
            strides,
            offsets,
            buffers,
        })
    }
}

fn launch_unary<T: 'static>(stream: &Stream, f: UnaryFn<T>, l: StridedLaunch) -> Result<()> {
    stream.launch(move || unsafe {
        f(
            l.num_els,
            l.dims.len(),
            l.dims.as_ptr(),
            l.strides.as_ptr(),
            l.offsets.as_ptr(),
            l.buffers[0].as_ptr::<T>(),
            l.buffers[1].as_ptr::<T>(),
        )
    })
}

fn launch_binary<T: 'static>(stream: &Stream, f: BinaryFn<T>, l: StridedLaunch) -> Result<()> {
    stream.launch(move || unsafe {
        f(
            l.num_els,
            l.dims.len(),
            l.dims.as_ptr(),
            l.strides.as_ptr(),
            l.offsets.as_ptr(),
            l.buffers[0].as_ptr::<T>(),
            l.buffers[1].as_ptr::<T>(),
            l.buffers[2].as_ptr::<T>(),
        )
    })
}

fn common_dtype(tensors: &[&Tensor]) -> Result<DType> {
    let dtype = tensors[0].dtype();
    for t in &tensors[1..] {
        if t.dtype() != dtype {
            return Err(Error::DTypeMismatch {
                expected: dtype,
                got: t.dtype(),
            });
        }
    }
    Ok(dtype)
}

fn unsupported(dtype: DType, op_type: OpType) -> Error {
    Error::UnsupportedDType {
        dtype,
        op: format!("cpu {}", op_type),
    }
}

macro_rules! dispatch_numeric {
    ($launch:ident, $name:ident, $dtype:expr, $op_type:expr, $stream:expr, $l:expr) => {
        paste::paste! {
            match $dtype {
                DType::BF16 => $launch::<bf16>($stream, [<$name _bf16>], $l),
                DType::F16 => $launch::<f16>($stream, [<$name _f16>], $l),
                DType::F32 => $launch::<f32>($stream, [<$name _f32>], $l),
                DType::F64 => $launch::<f64>($stream, [<$name _f64>], $l),
                DType::I8 => $launch::<i8>($stream, [<$name _i8>], $l),
                DType::I16 => $launch::<i16>($stream, [<$name _i16>], $l),
                DType::I32 => $launch::<i32>($stream, [<$name _i32>], $l),
                DType::I64 => $launch::<i64>($stream, [<$name _i64>], $l),
                DType::U8 => $launch::<u8>($stream, [<$name _u8>], $l),
                DType::U16 => $launch::<u16>($stream, [<$name _u16>], $l),
                DType::U32 => $launch::<u32>($stream, [<$name _u32>], $l),
                DType::U64 => $launch::<u64>($stream, [<$name _u64>], $l),
                other => Err(unsupported(other, $op_type)),
            }
        }
    };
}

// ────────────────────────────────────────────────────────────────────────────
//  Element-wise
// ────────────────────────────────────────────────────────────────────────────

pub struct BinaryKernel(pub OpType);

impl Kernel for BinaryKernel {
    fn compute(&self, op: OpRef<'_>, stream: &Stream) -> Result<()> {
        op.check_output_shapes()?;
        let (lhs, rhs, out) = (op.input(0)?, op.input(1)?, op.output(0)?);
        let dtype = common_dtype(&[lhs, rhs, out])?;
        let l = StridedLaunch::new(&[lhs, rhs], out)?;

        match self.0 {
            OpType::Add => dispatch_numeric!(launch_binary, add, dtype, self.0, stream, l),
            OpType::Sub => dispatch_numeric!(launch_binary, sub, dtype, self.0, stream, l),
            OpType::Mul => dispatch_numeric!(launch_binary, mul, dtype, self.0, stream, l),
            OpType::Div => dispatch_numeric!(launch_binary, div, dtype, self.0, stream, l),
            other => Err(Error::InvalidArgument(format!("{} is not a binary operator", other))),
        }
    }
}

pub struct UnaryKernel(pub OpType);

impl Kernel for UnaryKernel {
    fn compute(&self, op: OpRef<'_>, stream: &Stream) -> Result<()> {
        op.check_output_shapes()?;
        let (input, out) = (op.input(0)?, op.output(0)?);
        let dtype = common_dtype(&[input, out])?;
        let l = StridedLaunch::new(&[input], out)?;

        match self.0 {
            OpType::Relu => dispatch_numeric!(launch_unary, relu, dtype, self.0, stream, l),
            OpType::Neg => dispatch_numeric!(launch_unary, neg, dtype, self.0, stream, l),
            OpType::Abs => dispatch_numeric!(launch_unary, abs, dtype, self.0, stream, l),
            OpType::Sigmoid => match dtype {
                DType::BF16 => launch_unary::<bf16>(stream, sigmoid_bf16, l),
                DType::F16 => launch_unary::<f16>(stream, sigmoid_f16, l),
                DType::F32 => launch_unary::<f32>(stream, sigmoid_f32, l),
                DType::F64 => launch_unary::<f64>(stream, sigmoid_f64, l),
                other => Err(unsupported(other, self.0)),
            },
            // Copies only care about the element width.
            OpType::Identity => match dtype.size_in_bytes() {
                1 => launch_unary::<u8>(stream, copy_8, l),
                2 => launch_unary::<u16>(stream, copy_16, l),
                4 => launch_unary::<u32>(stream, copy_32, l),
                8 => launch_unary::<u64>(stream, copy_64, l),
                16 => launch_unary::<u128>(stream, copy_128, l),
                _ => Err(unsupported(dtype, self.0)),
            },
            other => Err(Error::InvalidArgument(format!("{} is not a unary operator", other))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
//  MatMul
// ────────────────────────────────────────────────────────────────────────────

struct MatMulLaunch {
    batch: Vec<usize>,
    m: usize,
    k: usize,
    n: usize,
    strides: Vec<isize>,
    offsets: [usize; 3],
    buffers: [Blob; 3],
}

fn launch_matmul<T: 'static>(stream: &Stream, f: MatMulFn<T>, l: MatMulLaunch) -> Result<()> {
    stream.launch(move || unsafe {
        f(
            l.batch.len(),
            l.batch.as_ptr(),
            l.m,
            l.k,
            l.n,
            l.strides.as_ptr(),
            l.offsets.as_ptr(),
            l.buffers[0].as_ptr::<T>(),
            l.buffers[1].as_ptr::<T>(),
            l.buffers[2].as_ptr::<T>(),
        )
    })
}

/// Batch strides broadcast to `batch`, followed by the two matrix strides.
fn matmul_operand_strides(t: &Tensor, batch: &[usize]) -> Result<Vec<isize>> {
    let split = t.rank() - 2;
    let mut strides = broadcast_stride(&t.shape()[..split], &t.stride()[..split], batch)?;
    strides.extend_from_slice(&t.stride()[split..]);
    Ok(strides)
}

pub struct MatMulKernel;

impl Kernel for MatMulKernel {
    fn compute(&self, op: OpRef<'_>, stream: &Stream) -> Result<()> {
        op.check_output_shapes()?;
        let (lhs, rhs, out) = (op.input(0)?, op.input(1)?, op.output(0)?);
        let dtype = common_dtype(&[lhs, rhs, out])?;

        let split = out.rank() - 2;
        let batch = out.shape()[..split].to_vec();
        let mut strides = matmul_operand_strides(lhs, &batch)?;
        strides.extend(matmul_operand_strides(rhs, &batch)?);
        strides.extend_from_slice(out.stride());

        let l = MatMulLaunch {
            m: out.shape()[split],
            k: lhs.shape()[lhs.rank() - 1],
            n: out.shape()[split + 1],
            batch,
            strides,
            offsets: [lhs.origin_offset(), rhs.origin_offset(), out.origin_offset()],
            buffers: [Arc::clone(lhs.blob()?), Arc::clone(rhs.blob()?), Arc::clone(out.blob()?)],
        };
        dispatch_numeric!(launch_matmul, matmul, dtype, OpType::MatMul, stream, l)
    }
}
