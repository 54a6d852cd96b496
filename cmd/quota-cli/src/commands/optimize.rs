use anyhow::Result;
use colored::Colorize;
use quota_optimizer::{
    fallback_optimization, EfficiencyIssue, Optimization, OptimizationInput, OptimizationParams,
    OptimizedWorkflow, OptimizerEngine, Workflow,
};
use tracing::warn;

use crate::utils::{load_json, percent, print_structured};
use crate::OutputFormat;

fn load_input(issues_path: Option<&str>) -> Result<OptimizationInput> {
    match issues_path {
        Some(path) => load_json(path),
        None => Ok(OptimizationInput::default()),
    }
}

pub fn handle_optimize(
    engine: &OptimizerEngine,
    workflow_path: &str,
    issues_path: Option<&str>,
    params: Option<OptimizationParams>,
    output: &OutputFormat,
) -> Result<()> {
    let workflow: Workflow = load_json(workflow_path)?;
    let input = load_input(issues_path)?;

    match engine.optimize_workflow(&workflow, &input, params.as_ref()) {
        Ok(optimized) => print_optimized(&optimized, output),
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, "Workflow rejected, reporting fallback optimization");
            eprintln!("{} {}", "Warning:".yellow().bold(), e);
            if let Some(action) = e.suggested_action() {
                eprintln!("  {}", action.bright_black());
            }

            let fallback = vec![fallback_optimization(&workflow)];
            if !print_structured(&fallback, output)? {
                print_optimizations(&fallback);
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn handle_identify(
    engine: &OptimizerEngine,
    workflow_path: &str,
    issues_path: Option<&str>,
    params: Option<OptimizationParams>,
    output: &OutputFormat,
) -> Result<()> {
    let workflow: Workflow = load_json(workflow_path)?;
    workflow.validate()?;

    let issues: Vec<EfficiencyIssue> = match load_input(issues_path)? {
        OptimizationInput::Issues(issues) => issues,
        OptimizationInput::Analysis(analysis) => {
            quota_optimizer::convert_analysis_to_issues(&analysis, &workflow)
        }
    };

    let optimizations = engine.identify_optimization_opportunities(&workflow, &issues, params.as_ref());
    if print_structured(&optimizations, output)? {
        return Ok(());
    }

    if optimizations.is_empty() {
        println!("{}", "No optimization opportunities found".yellow());
        return Ok(());
    }

    println!(
        "{} ({} found)",
        "Optimization opportunities:".bold().cyan(),
        optimizations.len()
    );
    println!();
    print_optimizations(&optimizations);
    Ok(())
}

fn print_optimizations(optimizations: &[Optimization]) {
    for optimization in optimizations {
        println!(
            "{} {} {}",
            "•".blue(),
            optimization.optimization_type.to_string().cyan().bold(),
            percent(optimization.estimated_savings.percentage)
        );
        println!("  {}", optimization.description);
        println!("  Steps: {}", optimization.steps_affected.join(", ").bright_black());
        println!(
            "  Saves: {} vibes, {} specs",
            optimization.estimated_savings.vibes, optimization.estimated_savings.specs
        );
        println!();
    }
}

fn print_optimized(optimized: &OptimizedWorkflow<'_>, output: &OutputFormat) -> Result<()> {
    if print_structured(optimized, output)? {
        return Ok(());
    }

    let gains = &optimized.efficiency_gains;
    println!("{} {}", "Optimized workflow:".bold().cyan(), optimized.id);
    println!(
        "  Cost: {} → {} (saves {}, {})",
        optimized.original_workflow.total_cost(),
        optimized.total_cost().to_string().green(),
        gains.cost_savings,
        percent(gains.total_savings_percentage)
    );
    println!(
        "  Vibe reduction: {:.1}%  Spec reduction: {:.1}%",
        gains.vibe_reduction, gains.spec_reduction
    );
    println!(
        "  Steps: {} → {}",
        optimized.original_workflow.steps.len(),
        optimized.steps.len()
    );
    println!();

    if optimized.optimizations.is_empty() {
        println!("{}", "No optimizations applied".yellow());
        return Ok(());
    }

    print_optimizations(&optimized.optimizations);

    println!("{}", "Steps:".bold());
    for step in &optimized.steps {
        println!(
            "  {} [{}] {} ({})",
            step.id.cyan(),
            step.step_type,
            step.description,
            step.quota_cost
        );
    }

    Ok(())
}
