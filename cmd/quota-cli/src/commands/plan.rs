use anyhow::Result;
use colored::Colorize;
use quota_optimizer::{OptimizerEngine, Workflow};

use crate::utils::{load_json, percent, print_structured};
use crate::OutputFormat;

pub fn handle_batch(engine: &OptimizerEngine, workflow_path: &str, output: &OutputFormat) -> Result<()> {
    let workflow: Workflow = load_json(workflow_path)?;
    let batches = engine.apply_batching_strategy(&workflow);

    if print_structured(&batches, output)? {
        return Ok(());
    }

    if batches.is_empty() {
        println!("{}", "No batchable steps found".yellow());
        return Ok(());
    }

    println!("{} ({} total)", "Batches:".bold().cyan(), batches.len());
    println!();
    for batch in &batches {
        println!("{} {} {}", "•".blue(), batch.id.cyan().bold(), percent(batch.estimated_savings as f64));
        println!("  {}", batch.description);
        println!("  Steps: {}", batch.original_operations.join(", ").bright_black());
        println!();
    }

    Ok(())
}

pub fn handle_cache(engine: &OptimizerEngine, workflow_path: &str, output: &OutputFormat) -> Result<()> {
    let workflow: Workflow = load_json(workflow_path)?;
    let cached = engine.implement_caching_layer(&workflow);

    if print_structured(&cached, output)? {
        return Ok(());
    }

    if cached.cache_points.is_empty() {
        println!("{}", "No cacheable steps found".yellow());
        return Ok(());
    }

    println!(
        "{} ({} points, mean hit rate {:.2})",
        "Cache plan:".bold().cyan(),
        cached.cache_points.len(),
        cached.estimated_hit_rate
    );
    println!();
    for point in &cached.cache_points {
        let ttl = point
            .ttl
            .map(|seconds| format!("{}s", seconds))
            .unwrap_or_else(|| "none".to_string());
        println!(
            "{} {}  hit rate {:.2}  ttl {}",
            "•".blue(),
            point.step_id.cyan().bold(),
            point.estimated_hit_rate,
            ttl
        );
        println!("  Key: {}", point.cache_key.bright_black());
    }

    Ok(())
}

pub fn handle_decompose(engine: &OptimizerEngine, workflow_path: &str, output: &OutputFormat) -> Result<()> {
    let workflow: Workflow = load_json(workflow_path)?;
    let specs = engine.break_into_specs(&workflow);

    if print_structured(&specs, output)? {
        return Ok(());
    }

    if specs.is_empty() {
        println!("{}", "Workflow is too small to decompose".yellow());
        return Ok(());
    }

    println!("{} ({} total)", "Specs:".bold().cyan(), specs.len());
    println!();
    for spec in &specs {
        println!("{} {} {}", "•".blue(), spec.name.cyan().bold(), spec.id.bright_black());
        println!("  {}", spec.description);
        println!("  Steps: {}", spec.steps.join(", "));
        println!("  Quota cost: {}", spec.estimated_quota_cost.to_string().green());
        println!();
    }

    Ok(())
}
