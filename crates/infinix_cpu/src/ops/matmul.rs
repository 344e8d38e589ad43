use crate::{
    element::Element,
    utils::{storage_extent, strided_offset},
};
use half::{bf16, f16};
use rayon::prelude::*;

/// Batched `out[b, i, j] = sum_k lhs[b, i, k] * rhs[b, k, j]`.
///
/// # Safety
///
/// Caller must guarantee that:
/// * `batch_dims` points to `num_batch_dims` output batch dimensions
/// * `strides` points to `3 * (num_batch_dims + 2)` signed element strides laid out
///   as `[lhs_strides, rhs_strides, out_strides]`, each being the batch strides
///   (0 where broadcast) followed by the two matrix strides
/// * `offsets` points to 3 origin offsets `[lhs, rhs, out]`
/// * every reachable offset is in bounds, `out` overlaps neither input, and distinct
///   output indices map to distinct output offsets
#[allow(clippy::too_many_arguments)]
pub unsafe fn matmul_strided<T: Element>(
    num_batch_dims: usize,
    batch_dims: *const usize,
    m: usize,
    k: usize,
    n: usize,
    strides: *const isize,
    offsets: *const usize,
    lhs: *const T,
    rhs: *const T,
    out: *mut T,
) {
    let batch_dims = std::slice::from_raw_parts(batch_dims, num_batch_dims);
    let rank = num_batch_dims + 2;
    let lhs_strides = std::slice::from_raw_parts(strides, rank);
    let rhs_strides = std::slice::from_raw_parts(strides.add(rank), rank);
    let out_strides = std::slice::from_raw_parts(strides.add(2 * rank), rank);
    let offsets = std::slice::from_raw_parts(offsets, 3);

    let batch: usize = batch_dims.iter().product();
    if batch == 0 || m == 0 || n == 0 {
        return;
    }

    let mut lhs_dims = batch_dims.to_vec();
    lhs_dims.extend([m, k]);
    let mut rhs_dims = batch_dims.to_vec();
    rhs_dims.extend([k, n]);
    let mut out_dims = batch_dims.to_vec();
    out_dims.extend([m, n]);

    let lhs = std::slice::from_raw_parts(lhs, storage_extent(&lhs_dims, lhs_strides, offsets[0]));
    let rhs = std::slice::from_raw_parts(rhs, storage_extent(&rhs_dims, rhs_strides, offsets[1]));

    let (lhs_bs, lhs_ms) = lhs_strides.split_at(num_batch_dims);
    let (rhs_bs, rhs_ms) = rhs_strides.split_at(num_batch_dims);
    let (out_bs, out_ms) = out_strides.split_at(num_batch_dims);

    let compute = |b: usize| -> Vec<(usize, T)> {
        let lhs_base = strided_offset(b, batch_dims, lhs_bs, offsets[0]) as isize;
        let rhs_base = strided_offset(b, batch_dims, rhs_bs, offsets[1]) as isize;
        let out_base = strided_offset(b, batch_dims, out_bs, offsets[2]) as isize;

        let mut values = Vec::with_capacity(m * n);
        for i in 0..m {
            for j in 0..n {
                let mut acc = T::zero();
                for p in 0..k {
                    let a = lhs[(lhs_base + i as isize * lhs_ms[0] + p as isize * lhs_ms[1]) as usize];
                    let c = rhs[(rhs_base + p as isize * rhs_ms[0] + j as isize * rhs_ms[1]) as usize];
                    acc = acc.add(a.mul(c));
                }
                let o = (out_base + i as isize * out_ms[0] + j as isize * out_ms[1]) as usize;
                values.push((o, acc));
            }
        }
        values
    };

    let results: Vec<Vec<(usize, T)>> = (0..batch).into_par_iter().map(compute).collect();

    let out = std::slice::from_raw_parts_mut(out, storage_extent(&out_dims, out_strides, offsets[2]));
    for (o, v) in results.into_iter().flatten() {
        out[o] = v;
    }
}

macro_rules! matmul_op {
    ([$($t:ident),* $(,)?]) => {
        paste::paste! {
            $(
                /// # Safety
                ///
                /// See [`matmul_strided`].
                #[allow(clippy::too_many_arguments)]
                pub unsafe fn [<matmul_ $t>](
                    num_batch_dims: usize,
                    batch_dims: *const usize,
                    m: usize,
                    k: usize,
                    n: usize,
                    strides: *const isize,
                    offsets: *const usize,
                    lhs: *const $t,
                    rhs: *const $t,
                    out: *mut $t,
                ) {
                    matmul_strided(num_batch_dims, batch_dims, m, k, n, strides, offsets, lhs, rhs, out);
                }
            )*
        }
    };
}

matmul_op!([bf16, f16, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_2x3_by_3x2() {
        let lhs = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let rhs = [7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0];
        let mut out = [0.0f32; 4];
        let batch: [usize; 0] = [];
        let strides = [3isize, 1, 2, 1, 2, 1];
        let offsets = [0usize; 3];
        unsafe {
            matmul_f32(0, batch.as_ptr(), 2, 3, 2, strides.as_ptr(), offsets.as_ptr(), lhs.as_ptr(), rhs.as_ptr(), out.as_mut_ptr());
        }
        assert_eq!(out, [58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn batched_with_broadcast_rhs() {
        // lhs [2, 1, 2], rhs [2, 1] shared across the batch
        let lhs = [1i32, 2, 3, 4];
        let rhs = [10i32, 100];
        let mut out = [0i32; 2];
        let batch = [2usize];
        let strides = [2isize, 2, 1, 0, 1, 1, 1, 1, 1];
        let offsets = [0usize; 3];
        unsafe {
            matmul_i32(1, batch.as_ptr(), 1, 2, 1, strides.as_ptr(), offsets.as_ptr(), lhs.as_ptr(), rhs.as_ptr(), out.as_mut_ptr());
        }
        assert_eq!(out, [210, 430]);
    }
}
