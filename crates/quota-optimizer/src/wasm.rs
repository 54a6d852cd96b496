//! Browser bindings: JSON string in, JSON string out

use crate::{OptimizationInput, OptimizationParams, OptimizerEngine, Workflow};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn parse_workflow(workflow_json: &str) -> Result<Workflow, JsValue> {
    serde_json::from_str(workflow_json)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse workflow: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string_pretty(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize results: {}", e)))
}

/// Optimize a workflow
///
/// # Arguments
/// * `workflow_json` - JSON string of the workflow
/// * `input_json` - Issue array or analysis object; empty means no issues
/// * `params_json` - Optional tuning parameters
#[wasm_bindgen]
pub fn optimize_workflow(
    workflow_json: &str,
    input_json: &str,
    params_json: Option<String>,
) -> Result<String, JsValue> {
    let workflow = parse_workflow(workflow_json)?;

    let input: OptimizationInput = if input_json.trim().is_empty() {
        OptimizationInput::default()
    } else {
        serde_json::from_str(input_json)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse issues: {}", e)))?
    };

    let params: Option<OptimizationParams> = params_json
        .filter(|json| !json.trim().is_empty())
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| JsValue::from_str(&format!("Failed to parse params: {}", e)))?;

    let optimized = OptimizerEngine::new()
        .optimize_workflow(&workflow, &input, params.as_ref())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    to_json(&optimized)
}

#[wasm_bindgen]
pub fn apply_batching_strategy(workflow_json: &str) -> Result<String, JsValue> {
    let workflow = parse_workflow(workflow_json)?;
    to_json(&OptimizerEngine::new().apply_batching_strategy(&workflow))
}

#[wasm_bindgen]
pub fn implement_caching_layer(workflow_json: &str) -> Result<String, JsValue> {
    let workflow = parse_workflow(workflow_json)?;
    to_json(&OptimizerEngine::new().implement_caching_layer(&workflow))
}

#[wasm_bindgen]
pub fn break_into_specs(workflow_json: &str) -> Result<String, JsValue> {
    let workflow = parse_workflow(workflow_json)?;
    to_json(&OptimizerEngine::new().break_into_specs(&workflow))
}

/// Registered optimizers as `[{ "id", "description" }]`
#[wasm_bindgen]
pub fn list_optimizers() -> Result<String, JsValue> {
    let optimizers: Vec<serde_json::Value> = OptimizerEngine::new()
        .list_optimizers()
        .into_iter()
        .map(|(id, description)| serde_json::json!({ "id": id, "description": description }))
        .collect();

    to_json(&optimizers)
}
