use criterion::{BatchSize, Criterion};
use infinix_core::dtype::DType;
use infinix_tensor::{ops::UnaryOp, Graph, Runtime, TensorId};

// Constants for benchmark graph sizes
const SIZES: [(usize, &str); 3] = [(16, "small"), (256, "medium"), (2048, "large")];

/// A chain of `len` unary operators, inserted consumer-first so the sort has
/// to reverse it.
fn reversed_chain(len: usize) -> Graph {
    let mut graph = Graph::new(Runtime::new());
    let tensors: Vec<TensorId> = (0..=len)
        .filter_map(|_| graph.add_tensor(&[4], DType::F32).ok())
        .collect();
    for i in (0..len).rev() {
        let _ = graph.add_op_with_outputs(UnaryOp::RELU, &[tensors[i]], &[tensors[i + 1]]);
    }
    graph
}

pub fn basic(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("graph/basic");
    group.warm_up_time(core::time::Duration::from_millis(500));
    group.measurement_time(core::time::Duration::from_secs(3));
    group.sample_size(20);

    for &(len, label) in &SIZES {
        group.bench_function(format!("topo_sort/{}", label), |b| {
            b.iter_batched(
                || reversed_chain(len),
                |mut graph| assert!(graph.topo_sort()),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}
