use super::check_arity;
use crate::operator::OpDef;
use infinix_core::{
    dtype::DType,
    error::{Error, Result},
    op_type::OpType,
};

/// Element-wise unary operator; the output has the input's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnaryOp(OpType);

impl UnaryOp {
    pub const RELU: UnaryOp = UnaryOp(OpType::Relu);
    pub const NEG: UnaryOp = UnaryOp(OpType::Neg);
    pub const ABS: UnaryOp = UnaryOp(OpType::Abs);
    pub const SIGMOID: UnaryOp = UnaryOp(OpType::Sigmoid);
    pub const IDENTITY: UnaryOp = UnaryOp(OpType::Identity);

    pub fn new(op_type: OpType) -> Result<Self> {
        if !op_type.is_unary() {
            return Err(Error::InvalidArgument(format!("{} is not a unary operator", op_type)));
        }
        Ok(Self(op_type))
    }
}

impl OpDef for UnaryOp {
    fn op_type(&self) -> OpType {
        self.0
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn infer_shape(&self, inputs: &[&[usize]]) -> Result<Vec<Vec<usize>>> {
        check_arity(self, inputs.len())?;
        Ok(vec![inputs[0].to_vec()])
    }

    fn infer_dtype(&self, inputs: &[DType]) -> Result<Vec<DType>> {
        check_arity(self, inputs.len())?;
        if self.0 == OpType::Sigmoid && !inputs[0].is_float() {
            return Err(Error::UnsupportedDType {
                dtype: inputs[0],
                op: self.0.to_string(),
            });
        }
        Ok(vec![inputs[0]])
    }
}
