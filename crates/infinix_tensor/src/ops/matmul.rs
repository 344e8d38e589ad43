use super::check_arity;
use crate::operator::OpDef;
use infinix_core::{
    dtype::DType,
    error::{Error, Result},
    layout::broadcast_shape,
    op_type::OpType,
};

/// `[.., m, k] x [.., k, n] -> [.., m, n]` with broadcast batch dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatMulOp;

impl OpDef for MatMulOp {
    fn op_type(&self) -> OpType {
        OpType::MatMul
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn infer_shape(&self, inputs: &[&[usize]]) -> Result<Vec<Vec<usize>>> {
        check_arity(self, inputs.len())?;
        let (lhs, rhs) = (inputs[0], inputs[1]);
        if lhs.len() < 2 || rhs.len() < 2 {
            return Err(Error::InvalidShape {
                message: format!("matmul needs rank >= 2, got {:?} and {:?}", lhs, rhs),
            });
        }
        let (lb, lm) = lhs.split_at(lhs.len() - 2);
        let (rb, rm) = rhs.split_at(rhs.len() - 2);
        if lm[1] != rm[0] {
            return Err(Error::ShapeMismatch {
                expected: vec![lm[1]],
                got: vec![rm[0]],
                msg: "matmul inner dimension".to_string(),
            });
        }
        let mut out = broadcast_shape(lb, rb)?;
        out.extend([lm[0], rm[1]]);
        Ok(vec![out])
    }

    fn infer_dtype(&self, inputs: &[DType]) -> Result<Vec<DType>> {
        check_arity(self, inputs.len())?;
        if inputs[0] != inputs[1] {
            return Err(Error::DTypeMismatch {
                expected: inputs[0],
                got: inputs[1],
            });
        }
        Ok(vec![inputs[0]])
    }
}
