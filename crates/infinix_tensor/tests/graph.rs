mod utils;

use infinix_core::{
    dtype::DType,
    error::{Error, Result},
};
use infinix_tensor::{
    ops::{BinaryOp, MatMulOp, UnaryOp},
    Graph, OpId, Runtime, Tensor, TensorId,
};
use utils::init_logger;

fn graph() -> Graph {
    init_logger();
    Graph::new(Runtime::new())
}

fn output_of(g: &Graph, op: OpId) -> Result<TensorId> {
    g.operator(op)
        .and_then(|o| o.outputs().first().copied())
        .ok_or_else(|| Error::InvalidArgument(format!("operator {} has no output", op)))
}

#[test]
fn add_op_links_both_sides() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[2, 3], DType::F32)?;
    let b = g.add_tensor(&[3], DType::F32)?;
    let op = g.add_op(BinaryOp::ADD, &[a, b])?;

    let out = output_of(&g, op)?;
    let out = g.tensor(out).ok_or_else(|| Error::InvalidArgument("missing output".into()))?;
    assert_eq!(out.shape(), &[2, 3]);
    assert_eq!(out.dtype(), DType::F32);
    assert_eq!(out.source(), Some(op));
    assert_eq!(g.tensor(a).map(|t| t.targets().to_vec()), Some(vec![op]));
    assert_eq!(g.num_tensors(), 3);
    assert!(g.check_valid());
    Ok(())
}

#[test]
fn add_op_rejects_bad_inputs() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[2, 3], DType::F32)?;
    let b = g.add_tensor(&[2, 3], DType::I32)?;
    let c = g.add_tensor(&[4, 5], DType::F32)?;
    assert!(matches!(g.add_op(BinaryOp::ADD, &[a, b]), Err(Error::DTypeMismatch { .. })));
    assert!(g.add_op(MatMulOp, &[a, c]).is_err());
    assert!(g.add_op(UnaryOp::RELU, &[a, a]).is_err());
    assert_eq!(g.num_operators(), 0);
    assert_eq!(g.num_tensors(), 3);
    Ok(())
}

#[test]
fn output_with_producer_is_rejected() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[4], DType::F32)?;
    let b = g.add_tensor(&[4], DType::F32)?;
    g.add_op_with_outputs(UnaryOp::RELU, &[a], &[b])?;
    assert!(matches!(
        g.add_op_with_outputs(UnaryOp::NEG, &[a], &[b]),
        Err(Error::InvalidGraph(_))
    ));
    Ok(())
}

#[test]
fn operator_cannot_write_its_own_input() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[4], DType::F32)?;
    let b = g.add_tensor(&[4], DType::F32)?;
    assert!(matches!(
        g.add_op_with_outputs(UnaryOp::RELU, &[a], &[a]),
        Err(Error::InvalidGraph(_))
    ));
    assert!(matches!(
        g.add_op_with_outputs(BinaryOp::ADD, &[b, a], &[b]),
        Err(Error::InvalidGraph(_))
    ));
    assert_eq!(g.num_operators(), 0);
    assert!(g.tensor(a).is_some_and(|t| t.source().is_none() && t.targets().is_empty()));
    assert!(g.check_valid());
    Ok(())
}

#[test]
fn topo_sort_orders_producers_first() -> Result<()> {
    let mut g = graph();
    let t0 = g.add_tensor(&[4], DType::F32)?;
    let t1 = g.add_tensor(&[4], DType::F32)?;
    let t2 = g.add_tensor(&[4], DType::F32)?;
    let t3 = g.add_tensor(&[4], DType::F32)?;

    // inserted consumer-first
    let op3 = g.add_op_with_outputs(BinaryOp::MUL, &[t2, t1], &[t3])?;
    let op2 = g.add_op_with_outputs(UnaryOp::NEG, &[t1], &[t2])?;
    let op1 = g.add_op_with_outputs(UnaryOp::RELU, &[t0], &[t1])?;
    assert!(!g.is_sorted());

    assert!(g.topo_sort());
    assert!(g.is_sorted());
    let order: Vec<_> = g.operators().map(|o| o.id()).collect();
    assert_eq!(order, vec![op1, op2, op3]);

    assert_eq!(g.predecessors(op3), vec![op2, op1]);
    assert_eq!(g.successors(op1), vec![op3, op2]);
    assert_eq!(g.input_tensors(), vec![t0]);
    assert_eq!(g.output_tensors(), vec![t3]);
    Ok(())
}

#[test]
fn cycle_is_reported_and_graph_stays_usable() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[4], DType::F32)?;
    let b = g.add_tensor(&[4], DType::F32)?;
    let op1 = g.add_op_with_outputs(UnaryOp::RELU, &[a], &[b])?;
    let op2 = g.add_op_with_outputs(UnaryOp::NEG, &[b], &[a])?;

    assert!(!g.topo_sort());
    assert!(!g.is_sorted());
    let order: Vec<_> = g.operators().map(|o| o.id()).collect();
    assert_eq!(order, vec![op1, op2]);
    assert!(matches!(g.shape_infer(), Err(Error::GraphNotSorted)));
    assert!(g.check_valid());

    // breaking the cycle makes the graph sortable again
    g.remove_operator(op2)?;
    assert_eq!(g.tensor(a).and_then(|t| t.source()), None);
    assert!(g.topo_sort());
    Ok(())
}

#[test]
fn shape_infer_follows_sorted_order() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[2, 3], DType::F32)?;
    let b = g.add_tensor(&[3, 4], DType::F32)?;
    let c = g.add_tensor(&[1], DType::F32)?;
    let d = g.add_tensor(&[1], DType::F32)?;
    g.add_op_with_outputs(UnaryOp::RELU, &[c], &[d])?;
    g.add_op_with_outputs(MatMulOp, &[a, b], &[c])?;

    assert!(matches!(g.shape_infer(), Err(Error::GraphNotSorted)));
    assert!(g.topo_sort());
    g.shape_infer()?;
    assert_eq!(g.tensor(c).map(|t| t.shape().to_vec()), Some(vec![2, 4]));
    assert_eq!(g.tensor(d).map(|t| t.shape().to_vec()), Some(vec![2, 4]));
    assert_eq!(g.tensor(d).map(|t| t.stride().to_vec()), Some(vec![4, 1]));

    // adding an operator invalidates the order
    g.add_op(UnaryOp::ABS, &[d])?;
    assert!(matches!(g.shape_infer(), Err(Error::GraphNotSorted)));
    Ok(())
}

#[test]
fn remove_tensor_severs_edges() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[4], DType::F32)?;
    let op1 = g.add_op(UnaryOp::RELU, &[a])?;
    let b = output_of(&g, op1)?;
    let op2 = g.add_op(UnaryOp::NEG, &[b])?;

    let removed = g.remove_tensor(b)?;
    assert!(removed.source().is_none());
    assert!(removed.targets().is_empty());
    assert!(g.tensor(b).is_none());
    assert_eq!(g.operator(op1).map(|o| o.outputs().len()), Some(0));
    assert_eq!(g.operator(op2).map(|o| o.inputs().len()), Some(0));
    assert!(g.check_valid());
    assert!(g.remove_tensor(b).is_err());
    Ok(())
}

#[test]
fn remove_operator_severs_edges() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[4], DType::F32)?;
    let op = g.add_op(BinaryOp::SUB, &[a, a])?;
    let out = output_of(&g, op)?;

    // `a` is consumed twice by the same operator
    assert_eq!(g.tensor(a).map(|t| t.targets().len()), Some(2));
    let removed = g.remove_operator(op)?;
    assert_eq!(removed.op_type(), infinix_core::op_type::OpType::Sub);
    assert_eq!(g.tensor(a).map(|t| t.targets().len()), Some(0));
    assert_eq!(g.tensor(out).and_then(|t| t.source()), None);
    assert_eq!(g.num_operators(), 0);
    assert!(g.check_valid());
    Ok(())
}

#[test]
fn duplicated_fuid_is_invalid() -> Result<()> {
    let mut g = graph();
    let t = Tensor::new(&[2], DType::F32)?;
    let dup = t.duplicate();
    g.insert_tensor(t)?;
    assert!(g.check_valid());
    g.insert_tensor(dup)?;
    assert!(!g.check_valid());
    Ok(())
}

#[test]
fn removed_tensor_can_be_reinserted() -> Result<()> {
    let mut g = graph();
    let ids = g.insert_tensors(vec![Tensor::new(&[1], DType::U8)?, Tensor::new(&[2], DType::U8)?])?;
    assert_eq!(ids.len(), 2);
    let removed = g.remove_tensor(ids[0])?;
    let id = g.insert_tensor(removed)?;
    assert_eq!(id, ids[0]);
    assert_eq!(g.tensors().map(|t| t.id()).collect::<Vec<_>>(), vec![ids[1], ids[0]]);
    Ok(())
}

#[test]
fn display_lists_tensors_and_operators() -> Result<()> {
    let mut g = graph();
    let a = g.add_tensor(&[2], DType::F32)?;
    let op = g.add_op(UnaryOp::SIGMOID, &[a])?;
    let text = g.to_string();
    assert!(text.contains("Graph Tensors:"));
    assert!(text.contains("Graph operators:"));
    assert!(text.contains(&format!("OP {}", op)));
    assert!(text.contains("Sigmoid"));
    assert!(text.contains(&format!("source {}", op)));
    Ok(())
}
