//! Strategy swarm: fan-out analysis with a barrier aggregation.
//!
//! ```text
//!            ┌──▶ market ──┐
//! planner ───┼──▶ tech   ──┼──▶ aggregator ──▶ END
//!            └──▶ risk   ──┘
//! ```
//!
//! The planner drafts a plan for the topic; three analysts assess it from
//! independent angles in the same superstep; the aggregator runs exactly
//! once, after all three have contributed, and synthesizes the final
//! report. `analyst_outputs` is an append channel, so the merged order is
//! the declaration order (market, tech, risk) regardless of which analyst
//! finished first.

use crate::error::Result;
use forgegraph_core::{ChatModel, CompiledGraph, GenerateRequest, MergePolicy, StateGraph, END};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const PLANNER_SYSTEM: &str = "You are a Chief Strategist. Break the given topic down into a \
    concrete, actionable plan with clear workstreams.";

const AGGREGATOR_SYSTEM: &str = "You are an Executive Editor. Synthesize the plan and the three \
    analyses into one coherent strategy report, citing the topic explicitly.";

const ANALYSTS: [(&str, &str, &str); 3] = [
    (
        "market",
        "market_analysis",
        "You are a Market Analyst. Assess demand, competition, and positioning for the plan.",
    ),
    (
        "tech",
        "technical_feasibility",
        "You are a Technical Analyst. Assess implementation complexity and feasibility of the plan.",
    ),
    (
        "risk",
        "risk_assessment",
        "You are a Risk Analyst. Identify the major risks in the plan and how to mitigate them.",
    ),
];

/// Build the fan-out/fan-in strategy workflow.
pub fn swarm_graph(model: Arc<dyn ChatModel>) -> Result<CompiledGraph> {
    let mut graph = StateGraph::new();
    graph
        .add_channel("topic", MergePolicy::Replace)
        .add_channel("plan", MergePolicy::Replace)
        .add_channel("analyst_outputs", MergePolicy::Append)
        .add_channel("market_analysis", MergePolicy::Replace)
        .add_channel("technical_feasibility", MergePolicy::Replace)
        .add_channel("risk_assessment", MergePolicy::Replace)
        .add_channel("final_report", MergePolicy::Replace);

    let planner_model = Arc::clone(&model);
    graph.add_node("planner", move |state: Value| {
        let model = Arc::clone(&planner_model);
        async move {
            let topic = state["topic"].as_str().unwrap_or_default().to_string();
            let response = model
                .generate(
                    GenerateRequest::new(format!("Topic: {topic}"))
                        .with_system_prompt(PLANNER_SYSTEM)
                        .with_temperature(0.2),
                )
                .await?;
            Ok(json!({"plan": response.content}))
        }
    });

    for (name, channel, system) in ANALYSTS {
        let analyst_model = Arc::clone(&model);
        graph.add_node(name, move |state: Value| {
            let model = Arc::clone(&analyst_model);
            async move {
                let topic = state["topic"].as_str().unwrap_or_default().to_string();
                let plan = state["plan"].as_str().unwrap_or_default().to_string();
                let response = model
                    .generate(
                        GenerateRequest::new(format!("Topic: {topic}\n\nPlan:\n{plan}"))
                            .with_system_prompt(system)
                            .with_temperature(0.2),
                    )
                    .await?;

                let mut update = Map::new();
                update.insert(channel.to_string(), Value::String(response.content.clone()));
                update.insert("analyst_outputs".to_string(), json!([response.content]));
                Ok(Value::Object(update))
            }
        });
    }

    let aggregator_model = Arc::clone(&model);
    graph.add_node("aggregator", move |state: Value| {
        let model = Arc::clone(&aggregator_model);
        async move {
            let topic = state["topic"].as_str().unwrap_or_default();
            let prompt = format!(
                "Topic: {topic}\n\nPlan:\n{}\n\nMarket analysis:\n{}\n\n\
                 Technical feasibility:\n{}\n\nRisk assessment:\n{}",
                state["plan"].as_str().unwrap_or_default(),
                state["market_analysis"].as_str().unwrap_or_default(),
                state["technical_feasibility"].as_str().unwrap_or_default(),
                state["risk_assessment"].as_str().unwrap_or_default(),
            );
            let response = model
                .generate(GenerateRequest::new(prompt).with_system_prompt(AGGREGATOR_SYSTEM))
                .await?;
            Ok(json!({"final_report": response.content}))
        }
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

    Ok(graph.compile()?)
}
