use crate::error::{Error, Result};

/// Shape plus signed element strides of a tensor view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Vec<usize>,
    stride: Vec<isize>,
}

impl Layout {
    pub fn new(shape: &[usize], stride: &[isize]) -> Result<Self> {
        validate(shape, stride)?;
        Ok(Self {
            shape: shape.to_vec(),
            stride: stride.to_vec(),
        })
    }

    pub fn from_shape(shape: &[usize]) -> Result<Self> {
        Self::new(shape, &compute_contiguous_stride(shape))
    }

    /// Replaces the shape and resets the stride to row-major contiguous.
    pub fn set_shape(&mut self, shape: &[usize]) -> Result<()> {
        let stride = compute_contiguous_stride(shape);
        validate(shape, &stride)?;
        self.shape = shape.to_vec();
        self.stride = stride;
        Ok(())
    }

    pub fn set_stride(&mut self, stride: &[isize]) -> Result<()> {
        validate(&self.shape, stride)?;
        self.stride = stride.to_vec();
        Ok(())
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
    pub fn stride(&self) -> &[isize] {
        &self.stride
    }

    pub fn storage_size(&self) -> usize {
        storage_size(&self.shape, &self.stride)
    }

    pub fn origin_offset(&self) -> usize {
        origin_offset(&self.shape, &self.stride)
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.shape, &self.stride)
    }

    pub fn can_broadcast_like(&self, target: &[usize]) -> bool {
        let rank_diff = target.len().saturating_sub(self.shape.len());
        if self.shape.len() > target.len() {
            return false;
        }
        self.shape
            .iter()
            .zip(&target[rank_diff..])
            .all(|(&a, &b)| a == b || a == 1)
    }
}

pub fn compute_contiguous_stride(shape: &[usize]) -> Vec<isize> {
    let mut stride = vec![1isize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        stride[i] = stride[i + 1] * shape[i + 1] as isize;
    }
    stride
}

pub fn validate(shape: &[usize], stride: &[isize]) -> Result<()> {
    if shape.len() != stride.len() {
        return Err(Error::InvalidShape {
            message: format!("rank {} shape {:?} with rank {} stride {:?}", shape.len(), shape, stride.len(), stride),
        });
    }
    if let Some(d) = shape.iter().position(|&s| s == 0) {
        return Err(Error::InvalidShape {
            message: format!("dimension {} of {:?} is zero", d, shape),
        });
    }
    Ok(())
}

/// Lowest and highest element offsets reachable from index `[0, .., 0]`.
pub fn offset_bounds(shape: &[usize], stride: &[isize]) -> (isize, isize) {
    let mut min = 0isize;
    let mut max = 0isize;
    for (&size, &s) in shape.iter().zip(stride) {
        let reach = (size as isize - 1) * s;
        if s >= 0 {
            max += reach;
        } else {
            min += reach;
        }
    }
    (min, max)
}

/// Number of element slots between the lowest and highest reachable offsets,
/// inclusive. A scalar needs one slot.
pub fn storage_size(shape: &[usize], stride: &[isize]) -> usize {
    let (min, max) = offset_bounds(shape, stride);
    (max - min) as usize + 1
}

/// Offset of index `[0, .., 0]` from the start of the storage.
pub fn origin_offset(shape: &[usize], stride: &[isize]) -> usize {
    let (min, _) = offset_bounds(shape, stride);
    (-min) as usize
}

pub fn is_contiguous(shape: &[usize], stride: &[isize]) -> bool {
    let mut acc = 1isize;
    for d in (0..shape.len()).rev() {
        if shape[d] > 1 && stride[d] != acc {
            return false;
        }
        acc *= shape[d] as isize;
    }
    true
}

/// NumPy-style broadcast of two shapes.
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![0; rank];
    for i in 0..rank {
        let a = if i < rank - lhs.len() { 1 } else { lhs[i - (rank - lhs.len())] };
        let b = if i < rank - rhs.len() { 1 } else { rhs[i - (rank - rhs.len())] };
        out[i] = match (a, b) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(Error::ShapeMismatch {
                    expected: lhs.to_vec(),
                    got: rhs.to_vec(),
                    msg: "shapes cannot be broadcast".to_string(),
                })
            }
        };
    }
    Ok(out)
}

/// Strides of `shape`/`stride` viewed at `target`: missing leading dimensions
/// and broadcast dimensions get stride 0.
pub fn broadcast_stride(shape: &[usize], stride: &[isize], target: &[usize]) -> Result<Vec<isize>> {
    if shape.len() > target.len() {
        return Err(Error::ShapeMismatch {
            expected: target.to_vec(),
            got: shape.to_vec(),
            msg: "cannot broadcast to a lower rank".to_string(),
        });
    }
    let rank_diff = target.len() - shape.len();
    let mut out = vec![0isize; target.len()];
    for (i, (&size, &s)) in shape.iter().zip(stride).enumerate() {
        let t = target[rank_diff + i];
        out[rank_diff + i] = if size == t {
            s
        } else if size == 1 {
            0
        } else {
            return Err(Error::ShapeMismatch {
                expected: target.to_vec(),
                got: shape.to_vec(),
                msg: "cannot broadcast".to_string(),
            });
        };
    }
    Ok(out)
}
