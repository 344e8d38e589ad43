use crate::{
    element::Element,
    utils::{is_contiguous, storage_extent, strided_offset},
};
use half::{bf16, f16};
use rayon::prelude::*;

/// # Safety
///
/// Caller must guarantee that:
/// * `dims` points to `num_dims` output dimensions
/// * `strides` points to `3 * num_dims` signed element strides laid out as
///   `[lhs_strides, rhs_strides, out_strides]`, already expanded to the output rank
///   (broadcast dimensions carry stride 0)
/// * `offsets` points to 3 origin offsets `[lhs, rhs, out]`
/// * every offset reachable through the dims and strides is in bounds for its buffer
/// * `out` does not overlap `lhs` or `rhs`, and distinct output indices map to
///   distinct output offsets
#[allow(clippy::too_many_arguments)]
pub unsafe fn binary_strided<T, F>(
    num_els: usize,
    num_dims: usize,
    dims: *const usize,
    strides: *const isize,
    offsets: *const usize,
    lhs: *const T,
    rhs: *const T,
    out: *mut T,
    op: F,
) where
    T: Copy + Send + Sync,
    F: Fn(T, T) -> T + Sync,
{
    if num_els == 0 {
        return;
    }

    let dims = std::slice::from_raw_parts(dims, num_dims);
    let lhs_strides = std::slice::from_raw_parts(strides, num_dims);
    let rhs_strides = std::slice::from_raw_parts(strides.add(num_dims), num_dims);
    let out_strides = std::slice::from_raw_parts(strides.add(2 * num_dims), num_dims);
    let offsets = std::slice::from_raw_parts(offsets, 3);

    let lhs = std::slice::from_raw_parts(lhs, storage_extent(dims, lhs_strides, offsets[0]));
    let rhs = std::slice::from_raw_parts(rhs, storage_extent(dims, rhs_strides, offsets[1]));

    let lhs_cont = is_contiguous(dims, lhs_strides);
    let rhs_cont = is_contiguous(dims, rhs_strides);

    let value = |i: usize| -> T {
        let l = if lhs_cont {
            offsets[0] + i
        } else {
            strided_offset(i, dims, lhs_strides, offsets[0])
        };
        let r = if rhs_cont {
            offsets[1] + i
        } else {
            strided_offset(i, dims, rhs_strides, offsets[1])
        };
        op(lhs[l], rhs[r])
    };

    if is_contiguous(dims, out_strides) {
        let out = std::slice::from_raw_parts_mut(out.add(offsets[2]), num_els);
        out.par_iter_mut().enumerate().for_each(|(i, o)| *o = value(i));
    } else {
        let out = std::slice::from_raw_parts_mut(out, storage_extent(dims, out_strides, offsets[2]));
        for i in 0..num_els {
            out[strided_offset(i, dims, out_strides, offsets[2])] = value(i);
        }
    }
}

macro_rules! binary_op {
    ($name:ident, $method:ident, [$($t:ident),* $(,)?]) => {
        paste::paste! {
            $(
                /// # Safety
                ///
                /// See [`binary_strided`].
                #[allow(clippy::too_many_arguments)]
                pub unsafe fn [<$name _ $t>](
                    num_els: usize,
                    num_dims: usize,
                    dims: *const usize,
                    strides: *const isize,
                    offsets: *const usize,
                    lhs: *const $t,
                    rhs: *const $t,
                    out: *mut $t,
                ) {
                    binary_strided(num_els, num_dims, dims, strides, offsets, lhs, rhs, out, |a: $t, b: $t| {
                        Element::$method(a, b)
                    });
                }
            )*
        }
    };
}

binary_op!(add, add, [bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);
binary_op!(sub, sub, [bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);
binary_op!(mul, mul, [bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);
binary_op!(div, div, [bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);
