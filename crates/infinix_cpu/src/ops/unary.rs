use crate::{
    element::{Element, Float},
    utils::{is_contiguous, storage_extent, strided_offset},
};
use half::{bf16, f16};
use rayon::prelude::*;

/// # Safety
///
/// Caller must guarantee that:
/// * `dims` points to `num_dims` dimensions
/// * `strides` points to `2 * num_dims` signed element strides laid out as
///   `[input_strides, out_strides]`
/// * `offsets` points to 2 origin offsets `[input, out]`
/// * every offset reachable through the dims and strides is in bounds for its buffer
/// * `out` does not overlap `input`, and distinct output indices map to distinct
///   output offsets
#[allow(clippy::too_many_arguments)]
pub unsafe fn unary_strided<T, F>(
    num_els: usize,
    num_dims: usize,
    dims: *const usize,
    strides: *const isize,
    offsets: *const usize,
    input: *const T,
    out: *mut T,
    op: F,
) where
    T: Copy + Send + Sync,
    F: Fn(T) -> T + Sync,
{
    if num_els == 0 {
        return;
    }

    let dims = std::slice::from_raw_parts(dims, num_dims);
    let in_strides = std::slice::from_raw_parts(strides, num_dims);
    let out_strides = std::slice::from_raw_parts(strides.add(num_dims), num_dims);
    let offsets = std::slice::from_raw_parts(offsets, 2);

    let input = std::slice::from_raw_parts(input, storage_extent(dims, in_strides, offsets[0]));
    let in_cont = is_contiguous(dims, in_strides);

    let value = |i: usize| -> T {
        let idx = if in_cont {
            offsets[0] + i
        } else {
            strided_offset(i, dims, in_strides, offsets[0])
        };
        op(input[idx])
    };

    if is_contiguous(dims, out_strides) {
        let out = std::slice::from_raw_parts_mut(out.add(offsets[1]), num_els);
        out.par_iter_mut().enumerate().for_each(|(i, o)| *o = value(i));
    } else {
        let out = std::slice::from_raw_parts_mut(out, storage_extent(dims, out_strides, offsets[1]));
        for i in 0..num_els {
            out[strided_offset(i, dims, out_strides, offsets[1])] = value(i);
        }
    }
}

macro_rules! unary_op {
    ($name:ident, $bound:ident :: $method:ident, [$($t:ident),* $(,)?]) => {
        paste::paste! {
            $(
                /// # Safety
                ///
                /// See [`unary_strided`].
                pub unsafe fn [<$name _ $t>](
                    num_els: usize,
                    num_dims: usize,
                    dims: *const usize,
                    strides: *const isize,
                    offsets: *const usize,
                    input: *const $t,
                    out: *mut $t,
                ) {
                    unary_strided(num_els, num_dims, dims, strides, offsets, input, out, |x: $t| $bound::$method(x));
                }
            )*
        }
    };
}

unary_op!(neg, Element::neg, [bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);
unary_op!(abs, Element::abs, [bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);
unary_op!(relu, Element::relu, [bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);
unary_op!(sigmoid, Float::sigmoid, [bf16, f16, f32, f64]);

// Copies move raw elements, so they are keyed by element width rather than type.
macro_rules! copy_op {
    ($($bits:literal => $t:ty),* $(,)?) => {
        paste::paste! {
            $(
                /// # Safety
                ///
                /// See [`unary_strided`].
                pub unsafe fn [<copy_ $bits>](
                    num_els: usize,
                    num_dims: usize,
                    dims: *const usize,
                    strides: *const isize,
                    offsets: *const usize,
                    input: *const $t,
                    out: *mut $t,
                ) {
                    unary_strided(num_els, num_dims, dims, strides, offsets, input, out, |x: $t| x);
                }
            )*
        }
    };
}

copy_op!(8 => u8, 16 => u16, 32 => u32, 64 => u64, 128 => u128);
