mod binary;
mod graph;
mod layout;

use criterion::criterion_group;

criterion_group!(benches, binary::basic, graph::basic, layout::basic);
