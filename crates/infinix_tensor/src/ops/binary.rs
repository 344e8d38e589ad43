use super::check_arity;
use crate::operator::OpDef;
use infinix_core::{
    dtype::DType,
    error::{Error, Result},
    layout::broadcast_shape,
    op_type::OpType,
};

/// Element-wise binary operator with NumPy-style broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryOp(OpType);

impl BinaryOp {
    pub const ADD: BinaryOp = BinaryOp(OpType::Add);
    pub const SUB: BinaryOp = BinaryOp(OpType::Sub);
    pub const MUL: BinaryOp = BinaryOp(OpType::Mul);
    pub const DIV: BinaryOp = BinaryOp(OpType::Div);

    pub fn new(op_type: OpType) -> Result<Self> {
        if !op_type.is_binary() {
            return Err(Error::InvalidArgument(format!("{} is not a binary operator", op_type)));
        }
        Ok(Self(op_type))
    }
}

impl OpDef for BinaryOp {
    fn op_type(&self) -> OpType {
        self.0
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn infer_shape(&self, inputs: &[&[usize]]) -> Result<Vec<Vec<usize>>> {
        check_arity(self, inputs.len())?;
        Ok(vec![broadcast_shape(inputs[0], inputs[1])?])
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
