//! Built-in operator definitions.

mod binary;
mod matmul;
mod unary;

pub use binary::BinaryOp;
pub use matmul::MatMulOp;
pub use unary::UnaryOp;

use infinix_core::error::{Error, Result};

fn check_arity(op: &dyn crate::operator::OpDef, got: usize) -> Result<()> {
    if got != op.num_inputs() {
        return Err(Error::InvalidArgument(format!(
            "{} takes {} inputs, got {}",
            op.op_type(),
            op.num_inputs(),
            got
        )));
    }
    Ok(())
}
