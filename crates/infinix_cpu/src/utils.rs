/// Row-major contiguity check over signed strides. Dimensions of size 1 may
/// carry any stride.
#[inline]
pub fn is_contiguous(dims: &[usize], strides: &[isize]) -> bool {
    let mut acc: isize = 1;
    for d in (0..dims.len()).rev() {
        if dims[d] > 1 && strides[d] != acc {
            return false;
        }
        acc *= dims[d] as isize;
    }
    true
}

/// Element offset of the `idx`-th logical element (row-major order) relative to
/// the storage start. `origin` is the offset of index `[0, .., 0]`.
#[inline]
pub fn strided_offset(idx: usize, dims: &[usize], strides: &[isize], origin: usize) -> usize {
    let mut offset = origin as isize;
    let mut rem = idx;
    for d in (0..dims.len()).rev() {
        offset += (rem % dims[d]) as isize * strides[d];
        rem /= dims[d];
    }
    offset as usize
}

/// Number of storage elements reachable from `origin` through `dims`/`strides`.
#[inline]
pub fn storage_extent(dims: &[usize], strides: &[isize], origin: usize) -> usize {
    let mut max = origin as isize;
    for (&d, &s) in dims.iter().zip(strides) {
        if s > 0 && d > 0 {
            max += (d as isize - 1) * s;
        }
    }
    max as usize + 1
}
