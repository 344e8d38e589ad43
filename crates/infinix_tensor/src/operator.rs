use crate::{
    graph::Graph,
    tensor::{Tensor, TensorId},
};
use infinix_core::{
    dtype::DType,
    error::{Error, Result},
    op_type::OpType,
};
use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(usize);
static OP_COUNTER: AtomicUsize = AtomicUsize::new(1);
#[inline]
pub(crate) fn next_op_id() -> OpId {
    OpId(OP_COUNTER.fetch_add(1, Ordering::SeqCst))
}

impl OpId {
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an operator computes, independent of where it sits in a graph.
pub trait OpDef: Send + Sync + fmt::Debug {
    fn op_type(&self) -> OpType;

    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize {
        1
    }

    /// Output shapes for the given input shapes. Must not depend on anything
    /// but its arguments.
    fn infer_shape(&self, inputs: &[&[usize]]) -> Result<Vec<Vec<usize>>>;

    fn infer_dtype(&self, inputs: &[DType]) -> Result<Vec<DType>> {
        match inputs.first() {
            Some(&dtype) => Ok(vec![dtype; self.num_outputs()]),
            None => Err(Error::InvalidArgument(format!("{} has no inputs", self.op_type()))),
        }
    }
}

#[derive(Debug)]
pub struct Operator {
    id: OpId,
    def: Box<dyn OpDef>,
    inputs: Vec<TensorId>,
    outputs: Vec<TensorId>,
}

impl Operator {
    pub(crate) fn new(def: Box<dyn OpDef>, inputs: Vec<TensorId>, outputs: Vec<TensorId>) -> Self {
        Self {
            id: next_op_id(),
            def,
            inputs,
            outputs,
        }
    }

    pub fn id(&self) -> OpId {
        self.id
    }
    pub fn op_type(&self) -> OpType {
        self.def.op_type()
    }
    pub fn def(&self) -> &dyn OpDef {
        self.def.as_ref()
    }
    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }
    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    pub(crate) fn remove_tensor(&mut self, tensor: TensorId) {
        self.inputs.retain(|&t| t != tensor);
        self.outputs.retain(|&t| t != tensor);
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<usize> = self.inputs.iter().map(|t| t.raw()).collect();
        let outputs: Vec<usize> = self.outputs.iter().map(|t| t.raw()).collect();
        write!(f, "{}({:?}) -> {:?}", self.op_type(), inputs, outputs)
    }
}

/// An operator together with the graph that owns its tensors. This is what
/// kernels receive.
#[derive(Clone, Copy)]
pub struct OpRef<'g> {
    op: &'g Operator,
    graph: &'g Graph,
}

impl<'g> OpRef<'g> {
    pub fn new(op: &'g Operator, graph: &'g Graph) -> Self {
        Self { op, graph }
    }

    pub fn op(&self) -> &'g Operator {
        self.op
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn op_type(&self) -> OpType {
        self.op.op_type()
    }

    pub fn input(&self, index: usize) -> Result<&'g Tensor> {
        self.lookup(self.op.inputs.get(index).copied(), "input", index)
    }

    pub fn output(&self, index: usize) -> Result<&'g Tensor> {
        self.lookup(self.op.outputs.get(index).copied(), "output", index)
    }

    fn lookup(&self, id: Option<TensorId>, role: &str, index: usize) -> Result<&'g Tensor> {
        let id = id.ok_or_else(|| {
            Error::InvalidArgument(format!("operator {} has no {} {}", self.op.id, role, index))
        })?;
        self.graph
            .tensor(id)
            .ok_or_else(|| Error::InvalidGraph(format!("tensor {} of operator {} is not in the graph", id, self.op.id)))
    }

    /// Checks that the bound outputs have the shapes the definition infers
    /// from the bound inputs.
    pub fn check_output_shapes(&self) -> Result<()> {
        let inputs = (0..self.op.inputs.len())
            .map(|i| self.input(i))
            .collect::<Result<Vec<_>>>()?;
        let shapes: Vec<&[usize]> = inputs.iter().map(|t| t.shape()).collect();
        let expected = self.op.def.infer_shape(&shapes)?;
        if expected.len() != self.op.outputs.len() {
            return Err(Error::InvalidGraph(format!(
                "operator {} infers {} outputs but has {}",
                self.op.id,
                expected.len(),
                self.op.outputs.len()
            )));
        }
        for (i, shape) in expected.into_iter().enumerate() {
            let out = self.output(i)?;
            if out.shape() != shape.as_slice() {
                return Err(Error::ShapeMismatch {
                    expected: shape,
                    got: out.shape().to_vec(),
                    msg: format!("output {} of {}", i, self.op.op_type()),
                });
            }
        }
        Ok(())
    }
}
