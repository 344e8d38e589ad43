use criterion::Criterion;
use infinix_core::{device::Device, dtype::DType, error::Result};
use infinix_tensor::{ops::BinaryOp, Graph, Runtime};
use std::sync::Arc;

// Constants for benchmark data sizes
const SIZES: [(usize, &str); 3] = [(100, "small"), (5000, "medium"), (100000, "large")];

fn add_graph(runtime: &Arc<Runtime>, size: usize) -> Result<Graph> {
    let mut graph = Graph::new(runtime.clone());
    let x = graph.add_tensor(&[size], DType::F32)?;
    let y = graph.add_tensor(&[size], DType::F32)?;
    graph.add_op(BinaryOp::ADD, &[x, y])?;
    graph.topo_sort();
    graph.data_malloc()?;

    let data: Vec<f32> = (0..size).map(|i| i as f32).collect();
    for id in [x, y] {
        if let Some(t) = graph.tensor(id) {
            t.copy_from_host(runtime, &data)?;
        }
    }
    Ok(graph)
}

pub fn basic(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("binary/basic");
    group.warm_up_time(core::time::Duration::from_millis(500));
    group.measurement_time(core::time::Duration::from_secs(3));
    group.sample_size(50);

    let setup = || -> Result<(Arc<Runtime>, infinix_tensor::Context)> {
        Runtime::init()?;
        let runtime = Runtime::new();
        let ctx = runtime.init_thread_context(Device::CPU, 0)?;
        Ok((runtime, ctx))
    };
    let Ok((runtime, ctx)) = setup() else {
        return;
    };

    for &(size, label) in &SIZES {
        let Ok(graph) = add_graph(&runtime, size) else {
            continue;
        };
        group.bench_function(format!("cpu/add/{}", label), |b| {
            b.iter(|| {
                runtime.run_with(&ctx, &graph).unwrap();
                ctx.stream().synchronize().unwrap();
            })
        });
    }

    group.finish();
}
