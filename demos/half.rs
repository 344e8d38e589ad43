use infinix::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let (runtime, ctx) = infinix::init()?;
    if ctx.device() != Device::CPU {
        println!("no kernels for {}, nothing to run", ctx.device());
        return Ok(());
    }

    let mut graph = Graph::new(runtime.clone());
    let a = graph.add_tensor(&[3], DType::BF16)?;
    let sum = graph.add_op(BinaryOp::ADD, &[a, a])?;
    let sum = graph.operator(sum).and_then(|op| op.outputs().first().copied()).ok_or("add has no output")?;
    let act = graph.add_op(UnaryOp::SIGMOID, &[sum])?;
    let act = graph.operator(act).and_then(|op| op.outputs().first().copied()).ok_or("sigmoid has no output")?;
    graph.topo_sort();
    graph.data_malloc()?;

    let values = [bf16::from_f32(1.0), bf16::from_f32(-2.5), bf16::from_f32(0.0)];
    graph.tensor(a).ok_or("missing input")?.copy_from_host(&runtime, &values)?;

    runtime.run(&graph)?;
    ctx.stream().synchronize()?;

    for (name, id) in [("a + a", sum), ("sigmoid(a + a)", act)] {
        let got = graph.tensor(id).ok_or("missing output")?.copy_to_host::<bf16>(&runtime)?;
        println!("{:<16} {:?}", name, got);
    }

    Ok(())
}
