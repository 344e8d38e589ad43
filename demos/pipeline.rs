use infinix::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let (runtime, ctx) = infinix::init()?;
    if ctx.device() != Device::CPU {
        println!("no kernels for {}, nothing to run", ctx.device());
        return Ok(());
    }

    let mut graph = Graph::new(runtime.clone());
    let x = graph.add_tensor(&[2, 2], DType::F64)?;
    let y = graph.add_tensor(&[2, 1], DType::F64)?;
    let prod = graph.add_tensor(&[1], DType::F64)?;
    let out = graph.add_tensor(&[1], DType::F64)?;

    // inserted out of order; the sort fixes it
    graph.add_op_with_outputs(BinaryOp::SUB, &[prod, y], &[out])?;
    graph.add_op_with_outputs(MatMulOp, &[x, y], &[prod])?;

    if !graph.topo_sort() {
        return Err("graph has a cycle".into());
    }
    graph.shape_infer()?;
    graph.data_malloc()?;

    let tensor = |id: TensorId| graph.tensor(id).ok_or(Error::InvalidArgument(format!("missing tensor {}", id)));
    tensor(x)?.copy_from_host(&runtime, &[1.0f64, 2.0, 3.0, 4.0])?;
    tensor(y)?.copy_from_host(&runtime, &[1.0f64, 1.0])?;

    runtime.run(&graph)?;
    runtime.synchronize()?;

    println!("{}", graph);
    println!("x @ y     = {:?}", tensor(prod)?.copy_to_host::<f64>(&runtime)?);
    println!("x @ y - y = {:?}", tensor(out)?.copy_to_host::<f64>(&runtime)?);

    Ok(())
}
