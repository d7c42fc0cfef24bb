//! End-to-end engine scenarios: the fan-out/fan-in aggregation workflow,
//! the approval pause/resume round trip, and a property check that merge
//! order never depends on completion latency.

use forgegraph_checkpoint::InMemorySaver;
use forgegraph_core::{GraphError, MergePolicy, RunStatus, StateGraph, END};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// The concrete scenario from the engine contract: planner fans out to
/// market/tech/risk, all three converge on an aggregator.
fn analyst_swarm(delays_ms: [u64; 3]) -> StateGraph {
    let mut graph = StateGraph::new();
    graph
        .add_channel("topic", MergePolicy::Replace)
        .add_channel("plan", MergePolicy::Replace)
        .add_channel("analyst_outputs", MergePolicy::Append)
        .add_channel("final_report", MergePolicy::Replace);

    graph.add_node("planner", |state: Value| async move {
        let topic = state["topic"].as_str().unwrap_or_default().to_string();
        Ok(json!({"plan": format!("strategic plan for {topic}")}))
    });

    for (tag, delay) in ["market", "tech", "risk"].into_iter().zip(delays_ms) {
        graph.add_node(tag, move |_state| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(json!({"analyst_outputs": [format!("{tag} result")]}))
        });
    }

    graph.add_node("aggregator", |state: Value| async move {
        let topic = state["topic"].as_str().unwrap_or_default();
        let outputs: Vec<&str> = state["analyst_outputs"]
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        Ok(json!({
            "final_report": format!("synthesis on {topic}: {}", outputs.join("; "))
        }))
    });

    graph
        .set_entry_point("planner")
        .add_edge("planner", "market")
        .add_edge("planner", "tech")
        .add_edge("planner", "risk")
        .add_edge("market", "aggregator")
        .add_edge("tech", "aggregator")
        .add_edge("risk", "aggregator")
        .add_edge("aggregator", END);
    graph
}

fn approval_graph(interrupts: bool) -> StateGraph {
    let mut graph = StateGraph::new();
    graph
        .add_channel("messages", MergePolicy::Append)
        .add_channel("feedback", MergePolicy::Replace)
        .add_channel("report", MergePolicy::Replace)
        .add_node("researcher", |_state| async move {
            Ok(json!({"messages": ["research notes"]}))
        })
        .add_node("manager", |_state| async move { Ok(json!({})) })
        .add_node("writer", |state: Value| async move {
            let notes = state["messages"]
                .as_array()
                .map(|m| m.len())
                .unwrap_or_default();
            Ok(json!({
                "report": format!("report built from {notes} messages"),
                "messages": ["report written"],
            }))
        })
        .set_entry_point("researcher")
        .add_edge("researcher", "manager")
        .add_conditional_edges(
            "manager",
            |state: &Value| match state["feedback"].as_str() {
                Some("APPROVE") => "writer".to_string(),
                Some(_) => "researcher".to_string(),
                None => "manager".to_string(),
            },
            [
                ("writer", "writer"),
                ("researcher", "researcher"),
                ("manager", "manager"),
            ],
        )
        .add_edge("writer", END);
    if interrupts {
        graph.interrupt_before(["manager"]);
    }
    graph
}

#[tokio::test]
async fn concrete_swarm_scenario() {
    let compiled = analyst_swarm([20, 10, 1]).compile().unwrap();
    let result = compiled.invoke(json!({"topic": "X"})).await.unwrap();

    assert_eq!(
        result["analyst_outputs"],
        json!(["market result", "tech result", "risk result"])
    );
    let report = result["final_report"].as_str().unwrap();
    assert!(report.contains("X"));
    assert!(report.contains("market result; tech result; risk result"));
}

#[tokio::test]
async fn repeated_runs_are_byte_identical() {
    let compiled = analyst_swarm([15, 5, 25]).compile().unwrap();

    let first = compiled.invoke(json!({"topic": "X"})).await.unwrap();
    let second = compiled.invoke(json!({"topic": "X"})).await.unwrap();

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn paused_then_approved_equals_direct_path() {
    // Paused variant: stop at the manager, inject approval, resume.
    let paused = approval_graph(true)
        .compile()
        .unwrap()
        .with_checkpointer(Arc::new(InMemorySaver::new()));

    let first = paused
        .run("equiv", Some(json!({"messages": ["topic: rust"]})))
        .await
        .unwrap();
    assert_eq!(first.status, RunStatus::Paused);
    assert_eq!(first.pending_nodes, vec!["manager".to_string()]);

    paused
        .update_state("equiv", json!({"feedback": "APPROVE"}), "manager")
        .await
        .unwrap();
    let resumed = paused.run("equiv", None).await.unwrap();
    assert_eq!(resumed.status, RunStatus::Complete);

    // Direct variant: same graph, no interrupt, approval present up front.
    let direct = approval_graph(false).compile().unwrap();
    let direct_state = direct
        .invoke(json!({"messages": ["topic: rust"], "feedback": "APPROVE"}))
        .await
        .unwrap();

    assert_eq!(resumed.state, direct_state);
}

#[tokio::test]
async fn always_retry_router_hits_recursion_limit() {
    let mut graph = StateGraph::new();
    graph
        .add_node("retry_forever", |_state| async move { Ok(json!({})) })
        .set_entry_point("retry_forever")
        .add_conditional_edges(
            "retry_forever",
            |_state: &Value| "retry".to_string(),
            [("retry", "retry_forever")],
        );
    let compiled = graph.compile().unwrap().with_recursion_limit(25);

    let err = compiled.invoke(json!({})).await.unwrap_err();
    assert!(matches!(err, GraphError::GraphRecursion { limit: 25, .. }));
}

#[tokio::test]
async fn threads_are_isolated_on_a_shared_graph() {
    let compiled = analyst_swarm([1, 1, 1])
        .compile()
        .unwrap()
        .with_checkpointer(Arc::new(InMemorySaver::new()));

    let alpha = compiled.run("alpha", Some(json!({"topic": "alpha"}))).await.unwrap();
    let beta = compiled.run("beta", Some(json!({"topic": "beta"}))).await.unwrap();

    assert!(alpha.state["final_report"].as_str().unwrap().contains("alpha"));
    assert!(beta.state["final_report"].as_str().unwrap().contains("beta"));
    assert!(!beta.state["final_report"].as_str().unwrap().contains("alpha"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Analyst output order is declaration order for every latency
    /// assignment, i.e. completion order never leaks into merged state.
    #[test]
    fn merge_order_is_latency_independent(
        d1 in 0u64..10,
        d2 in 0u64..10,
        d3 in 0u64..10,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let outputs = runtime.block_on(async move {
            let compiled = analyst_swarm([d1, d2, d3]).compile().unwrap();
            compiled.invoke(json!({"topic": "X"})).await.unwrap()["analyst_outputs"].clone()
        });

        prop_assert_eq!(outputs, json!(["market result", "tech result", "risk result"]));
    }
}
