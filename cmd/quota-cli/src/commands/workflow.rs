use anyhow::Result;
use colored::Colorize;
use quota_optimizer::{OptimizerEngine, StepPatterns, Workflow};
use serde_json::json;

use crate::utils::{load_json, print_structured};
use crate::OutputFormat;

pub fn handle_validate(workflow_path: &str, output: &OutputFormat) -> Result<()> {
    let workflow: Workflow = load_json(workflow_path)?;
    let result = workflow.validate();

    let report = match &result {
        Ok(()) => json!({ "valid": true, "workflowId": workflow.id }),
        Err(e) => json!({
            "valid": false,
            "workflowId": workflow.id,
            "stage": e.stage(),
            "error": e.to_string(),
            "suggestedAction": e.suggested_action(),
        }),
    };

    if !print_structured(&report, output)? {
        match &result {
            Ok(()) => {
                let patterns = StepPatterns::analyze(&workflow);
                println!("{} {}", "✓".green().bold(), format!("Workflow '{}' is valid", workflow.id).green());
                println!(
                    "  Steps: {} ({} vibe, {} spec, {} data retrieval)",
                    patterns.step_count,
                    patterns.vibe_steps.len(),
                    patterns.spec_steps.len(),
                    patterns.data_retrieval_steps.len()
                );
                println!(
                    "  Quota cost: {} (avg {:.1} per step)",
                    patterns.total_quota_cost, patterns.avg_step_cost
                );
            }
            Err(e) => {
                println!("{} {}", "✗".red().bold(), e.to_string().red());
                if let Some(action) = e.suggested_action() {
                    println!("  {}", action.bright_black());
                }
            }
        }
    }

    result.map_err(Into::into)
}

pub fn handle_list(engine: &OptimizerEngine, output: &OutputFormat) -> Result<()> {
    let optimizers = engine.list_optimizers();

    match output {
        OutputFormat::Json | OutputFormat::Compact => {
            let listed: Vec<_> = optimizers
                .iter()
                .map(|(id, description)| json!({ "id": id, "description": description }))
                .collect();
            print_structured(&listed, output)?;
        }
        OutputFormat::Pretty => {
            println!("{}", "Registered optimizers:".bold().cyan());
            for (id, description) in optimizers {
                println!("{} {}  {}", "•".blue(), id.cyan().bold(), description.bright_black());
            }
        }
    }

    Ok(())
}
