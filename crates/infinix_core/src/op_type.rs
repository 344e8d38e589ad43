#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpType {
    Add,
    Sub,
    Mul,
    Div,
    Relu,
    Neg,
    Abs,
    Sigmoid,
    Identity,
    MatMul,
}

impl OpType {
    pub const ALL: [OpType; 10] = [
        OpType::Add,
        OpType::Sub,
        OpType::Mul,
        OpType::Div,
        OpType::Relu,
        OpType::Neg,
        OpType::Abs,
        OpType::Sigmoid,
        OpType::Identity,
        OpType::MatMul,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Add => "Add",
            OpType::Sub => "Sub",
            OpType::Mul => "Mul",
            OpType::Div => "Div",
            OpType::Relu => "Relu",
            OpType::Neg => "Neg",
            OpType::Abs => "Abs",
            OpType::Sigmoid => "Sigmoid",
            OpType::Identity => "Identity",
            OpType::MatMul => "MatMul",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, OpType::Add | OpType::Sub | OpType::Mul | OpType::Div)
    }

    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            OpType::Relu | OpType::Neg | OpType::Abs | OpType::Sigmoid | OpType::Identity
        )
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
