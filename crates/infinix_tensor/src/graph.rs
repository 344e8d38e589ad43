use crate::{
    operator::{OpDef, OpId, OpRef, Operator},
    runtime::Runtime,
    tensor::{Tensor, TensorId},
};
use infinix_core::{
    dtype::DType,
    error::{Error, Result},
};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

/// Dataflow graph of tensors and operators.
///
/// The graph owns every tensor and operator it holds. Producer and consumer
/// links are ids into the graph's own tables, so removing an entity only has
/// to clear the ids on the opposite side.
pub struct Graph {
    runtime: Arc<Runtime>,
    tensors: HashMap<TensorId, Tensor>,
    tensor_order: Vec<TensorId>,
    operators: HashMap<OpId, Operator>,
    op_order: Vec<OpId>,
    sorted: bool,
}

impl Graph {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            tensors: HashMap::new(),
            tensor_order: Vec::new(),
            operators: HashMap::new(),
            op_order: Vec::new(),
            sorted: false,
        }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    // ────────────────────────────────────────────────────────────────────────
    //  Construction
    // ────────────────────────────────────────────────────────────────────────

    pub fn add_tensor(&mut self, shape: &[usize], dtype: DType) -> Result<TensorId> {
        self.insert_tensor(Tensor::new(shape, dtype)?)
    }

    /// Takes ownership of a free-standing tensor.
    pub fn insert_tensor(&mut self, tensor: Tensor) -> Result<TensorId> {
        let id = tensor.id();
        if self.tensors.contains_key(&id) {
            return Err(Error::InvalidGraph(format!("tensor {} is already in the graph", id)));
        }
        if tensor.source().is_some() || !tensor.targets().is_empty() {
            return Err(Error::InvalidGraph(format!("tensor {} is still linked to operators", id)));
        }
        self.tensors.insert(id, tensor);
        self.tensor_order.push(id);
        Ok(id)
    }

    pub fn insert_tensors(&mut self, tensors: Vec<Tensor>) -> Result<Vec<TensorId>> {
        tensors.into_iter().map(|t| self.insert_tensor(t)).collect()
    }

    /// Adds an operator whose outputs are created by the graph from the
    /// definition's shape and dtype inference.
    pub fn add_op<D: OpDef + 'static>(&mut self, def: D, inputs: &[TensorId]) -> Result<OpId> {
        let (shapes, dtypes): (Vec<&[usize]>, Vec<DType>) = inputs
            .iter()
            .map(|&id| self.require_tensor(id).map(|t| (t.shape(), t.dtype())))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();
        let out_shapes = def.infer_shape(&shapes)?;
        let out_dtypes = def.infer_dtype(&dtypes)?;
        if out_shapes.len() != out_dtypes.len() {
            return Err(Error::Internal {
                message: format!(
                    "{} infers {} shapes but {} dtypes",
                    def.op_type(),
                    out_shapes.len(),
                    out_dtypes.len()
                ),
            });
        }

        let outputs = out_shapes
            .iter()
            .zip(&out_dtypes)
            .map(|(shape, &dtype)| Tensor::new(shape, dtype))
            .collect::<Result<Vec<_>>>()?;
        let output_ids = self.insert_tensors(outputs)?;
        self.connect(Box::new(def), inputs.to_vec(), output_ids)
    }

    /// Adds an operator writing into tensors already in the graph. An output
    /// that already has a producer, or that the operator also reads, is
    /// rejected.
    pub fn add_op_with_outputs<D: OpDef + 'static>(
        &mut self,
        def: D,
        inputs: &[TensorId],
        outputs: &[TensorId],
    ) -> Result<OpId> {
        if inputs.len() != def.num_inputs() {
            return Err(Error::InvalidArgument(format!(
                "{} takes {} inputs, got {}",
                def.op_type(),
                def.num_inputs(),
                inputs.len()
            )));
        }
        if outputs.len() != def.num_outputs() {
            return Err(Error::InvalidArgument(format!(
                "{} produces {} outputs, got {}",
                def.op_type(),
                def.num_outputs(),
                outputs.len()
            )));
        }
        for &id in inputs {
            self.require_tensor(id)?;
        }
        let mut seen = HashSet::new();
        for &id in outputs {
            let tensor = self.require_tensor(id)?;
            if let Some(op) = tensor.source() {
                return Err(Error::InvalidGraph(format!("tensor {} is already produced by operator {}", id, op)));
            }
            if !seen.insert(id) {
                return Err(Error::InvalidGraph(format!("tensor {} is listed twice as an output", id)));
            }
            if inputs.contains(&id) {
                return Err(Error::InvalidGraph(format!("tensor {} is both an input and an output", id)));
            }
        }
        self.connect(Box::new(def), inputs.to_vec(), outputs.to_vec())
    }

    fn connect(&mut self, def: Box<dyn OpDef>, inputs: Vec<TensorId>, outputs: Vec<TensorId>) -> Result<OpId> {
        let op = Operator::new(def, inputs, outputs);
        let id = op.id();
        for input in op.inputs() {
            if let Some(t) = self.tensors.get_mut(input) {
                t.add_target(id);
            }
        }
        for output in op.outputs() {
            if let Some(t) = self.tensors.get_mut(output) {
                t.set_source(id);
            }
        }
        self.operators.insert(id, op);
        self.op_order.push(id);
        self.sorted = false;
        Ok(id)
    }

    // ────────────────────────────────────────────────────────────────────────
    //  Removal
    // ────────────────────────────────────────────────────────────────────────

    /// Detaches an operator. Its inputs stop listing it as a consumer and its
    /// outputs lose their producer.
    pub fn remove_operator(&mut self, id: OpId) -> Result<Operator> {
        let op = self
            .operators
            .remove(&id)
            .ok_or_else(|| Error::InvalidArgument(format!("operator {} is not in the graph", id)))?;
        self.op_order.retain(|&o| o != id);
        for input in op.inputs() {
            if let Some(t) = self.tensors.get_mut(input) {
                t.remove_target(id);
            }
        }
        for output in op.outputs() {
            if let Some(t) = self.tensors.get_mut(output) {
                if t.source() == Some(id) {
                    t.clear_source();
                }
            }
        }
        Ok(op)
    }

    /// Detaches a tensor. Operators that read or write it drop it from their
    /// input and output lists. The returned tensor has no links.
    pub fn remove_tensor(&mut self, id: TensorId) -> Result<Tensor> {
        let mut tensor = self
            .tensors
            .remove(&id)
            .ok_or_else(|| Error::InvalidArgument(format!("tensor {} is not in the graph", id)))?;
        self.tensor_order.retain(|&t| t != id);
        let linked = tensor.source().into_iter().chain(tensor.targets().iter().copied());
        for op in linked {
            if let Some(op) = self.operators.get_mut(&op) {
                op.remove_tensor(id);
            }
        }
        tensor.clear_links();
        Ok(tensor)
    }

    // ────────────────────────────────────────────────────────────────────────
    //  Passes
    // ────────────────────────────────────────────────────────────────────────

    /// Orders operators so every producer comes before its consumers.
    ///
    /// Each pass places, in current order, every operator whose inputs are
    /// graph inputs or come from an operator placed earlier. A pass that
    /// places nothing means a cycle: the order is left untouched and `false`
    /// is returned.
    pub fn topo_sort(&mut self) -> bool {
        if self.sorted {
            return true;
        }
        let mut placed: HashSet<OpId> = HashSet::with_capacity(self.op_order.len());
        let mut sorted: Vec<OpId> = Vec::with_capacity(self.op_order.len());

        while sorted.len() < self.op_order.len() {
            let before = sorted.len();
            for &id in &self.op_order {
                if placed.contains(&id) {
                    continue;
                }
                let ready = self.operators[&id].inputs().iter().all(|input| {
                    match self.tensors.get(input).and_then(|t| t.source()) {
                        Some(producer) => placed.contains(&producer) || !self.operators.contains_key(&producer),
                        None => true,
                    }
                });
                if ready {
                    placed.insert(id);
                    sorted.push(id);
                }
            }
            if sorted.len() == before {
                log::warn!(
                    "cycle detected: {} of {} operators could not be ordered",
                    self.op_order.len() - before,
                    self.op_order.len()
                );
                return false;
            }
        }

        self.op_order = sorted;
        self.sorted = true;
        true
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Propagates shapes through the sorted operators. Outputs whose shape
    /// changes get a contiguous stride.
    pub fn shape_infer(&mut self) -> Result<()> {
        if !self.sorted {
            return Err(Error::GraphNotSorted);
        }
        for i in 0..self.op_order.len() {
            let op = &self.operators[&self.op_order[i]];
            let (shapes, outputs) = {
                let shapes = op
                    .inputs()
                    .iter()
                    .map(|&id| self.require_tensor(id).map(|t| t.shape()))
                    .collect::<Result<Vec<_>>>()?;
                (op.def().infer_shape(&shapes)?, op.outputs().to_vec())
            };
            if shapes.len() != outputs.len() {
                return Err(Error::InvalidGraph(format!(
                    "operator {} infers {} outputs but has {}",
                    op.id(),
                    shapes.len(),
                    outputs.len()
                )));
            }
            for (id, shape) in outputs.into_iter().zip(shapes) {
                let tensor = self.require_tensor_mut(id)?;
                if tensor.shape() != shape.as_slice() {
                    tensor.set_shape(&shape)?;
                }
            }
        }
        Ok(())
    }

    /// Allocates storage for every tensor that has none yet.
    pub fn data_malloc(&mut self) -> Result<()> {
        let runtime = Arc::clone(&self.runtime);
        for id in &self.tensor_order {
            if let Some(tensor) = self.tensors.get_mut(id) {
                if !tensor.is_allocated() {
                    tensor.data_malloc(&runtime)?;
                }
            }
        }
        Ok(())
    }

    /// Checks that every link is mirrored on the other side, that no operator
    /// reads its own output and that functional ids are unique.
    pub fn check_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidGraph(msg));

        for op in self.operators() {
            if let Some(id) = op.outputs().iter().find(|id| op.inputs().contains(id)) {
                return invalid(format!("operator {} reads its own output {}", op.id(), id));
            }
            for &input in op.inputs() {
                match self.tensors.get(&input) {
                    Some(t) if t.targets().contains(&op.id()) => {}
                    Some(_) => return invalid(format!("tensor {} does not list operator {} as a target", input, op.id())),
                    None => return invalid(format!("input {} of operator {} is not in the graph", input, op.id())),
                }
            }
            for &output in op.outputs() {
                match self.tensors.get(&output) {
                    Some(t) if t.source() == Some(op.id()) => {}
                    Some(_) => return invalid(format!("tensor {} does not list operator {} as its source", output, op.id())),
                    None => return invalid(format!("output {} of operator {} is not in the graph", output, op.id())),
                }
            }
        }

        let mut fuids = HashSet::new();
        for tensor in self.tensors() {
            if let Some(src) = tensor.source() {
                match self.operators.get(&src) {
                    Some(op) if op.outputs().contains(&tensor.id()) => {}
                    Some(_) => return invalid(format!("operator {} does not list tensor {} as an output", src, tensor.id())),
                    None => return invalid(format!("source {} of tensor {} is not in the graph", src, tensor.id())),
                }
            }
            for &target in tensor.targets() {
                match self.operators.get(&target) {
                    Some(op) if op.inputs().contains(&tensor.id()) => {}
                    Some(_) => return invalid(format!("operator {} does not list tensor {} as an input", target, tensor.id())),
                    None => return invalid(format!("target {} of tensor {} is not in the graph", target, tensor.id())),
                }
            }
            if !fuids.insert(tensor.fuid()) {
                return invalid(format!("functional id {} appears twice", tensor.fuid()));
            }
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    //  Queries
    // ────────────────────────────────────────────────────────────────────────

    pub fn tensor(&self, id: TensorId) -> Option<&Tensor> {
        self.tensors.get(&id)
    }

    pub fn tensor_mut(&mut self, id: TensorId) -> Option<&mut Tensor> {
        self.tensors.get_mut(&id)
    }

    pub fn operator(&self, id: OpId) -> Option<&Operator> {
        self.operators.get(&id)
    }

    pub fn op_ref(&self, id: OpId) -> Option<OpRef<'_>> {
        self.operators.get(&id).map(|op| OpRef::new(op, self))
    }

    /// Tensors in insertion order.
    pub fn tensors(&self) -> impl Iterator<Item = &Tensor> + '_ {
        self.tensor_order.iter().filter_map(|id| self.tensors.get(id))
    }

    /// Operators in their current order.
    pub fn operators(&self) -> impl Iterator<Item = &Operator> + '_ {
        self.op_order.iter().filter_map(|id| self.operators.get(id))
    }

    pub fn num_tensors(&self) -> usize {
        self.tensor_order.len()
    }

    pub fn num_operators(&self) -> usize {
        self.op_order.len()
    }

    /// Tensors without a producer.
    pub fn input_tensors(&self) -> Vec<TensorId> {
        self.tensors().filter(|t| t.source().is_none()).map(|t| t.id()).collect()
    }

    /// Tensors nobody consumes.
    pub fn output_tensors(&self) -> Vec<TensorId> {
        self.tensors().filter(|t| t.targets().is_empty()).map(|t| t.id()).collect()
    }

    /// Producers of the operator's inputs, without duplicates.
    pub fn predecessors(&self, id: OpId) -> Vec<OpId> {
        let Some(op) = self.operators.get(&id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for input in op.inputs() {
            if let Some(src) = self.tensors.get(input).and_then(|t| t.source()) {
                if !out.contains(&src) {
                    out.push(src);
                }
            }
        }
        out
    }

    /// Consumers of the operator's outputs, without duplicates.
    pub fn successors(&self, id: OpId) -> Vec<OpId> {
        let Some(op) = self.operators.get(&id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for output in op.outputs() {
            if let Some(t) = self.tensors.get(output) {
                for &target in t.targets() {
                    if !out.contains(&target) {
                        out.push(target);
                    }
                }
            }
        }
        out
    }

    fn require_tensor(&self, id: TensorId) -> Result<&Tensor> {
        self.tensors
            .get(&id)
            .ok_or_else(|| Error::InvalidArgument(format!("tensor {} is not in the graph", id)))
    }

    fn require_tensor_mut(&mut self, id: TensorId) -> Result<&mut Tensor> {
        self.tensors
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidArgument(format!("tensor {} is not in the graph", id)))
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Tensors:")?;
        for tensor in self.tensors() {
            writeln!(f, "{}", tensor)?;
        }
        writeln!(f, "Graph operators:")?;
        for op in self.operators() {
            let preds: Vec<usize> = self.predecessors(op.id()).iter().map(|o| o.raw()).collect();
            let succs: Vec<usize> = self.successors(op.id()).iter().map(|o| o.raw()).collect();
            writeln!(f, "OP {}, pred {:?}, succ {:?}, {}", op.id(), preds, succs, op)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("tensors", &self.tensor_order.len())
            .field("operators", &self.op_order.len())
            .field("sorted", &self.sorted)
            .finish()
    }
}
