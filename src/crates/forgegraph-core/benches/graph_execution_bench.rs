use criterion::{black_box, criterion_group, criterion_main, Criterion};
use forgegraph_core::{MergePolicy, StateGraph, END};
use serde_json::{json, Value};

fn linear_graph() -> forgegraph_core::CompiledGraph {
    let mut graph = StateGraph::new();
    graph
        .add_channel("messages", MergePolicy::Append)
        .add_node("first", |_state: Value| async move {
            Ok(json!({"messages": ["one"]}))
        })
        .add_node("second", |_state: Value| async move {
            Ok(json!({"messages": ["two"]}))
        })
        .add_node("third", |_state: Value| async move {
            Ok(json!({"messages": ["three"]}))
        })
        .set_entry_point("first")
        .add_edge("first", "second")
        .add_edge("second", "third")
        .add_edge("third", END);
    graph.compile().unwrap()
}

fn bench_linear_invoke(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let compiled = linear_graph();

    c.bench_function("linear_three_node_invoke", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(compiled.invoke(json!({})).await.unwrap());
            })
        })
    });
}

criterion_group!(benches, bench_linear_invoke);
criterion_main!(benches);
