//! Command execution.

use crate::Commands;
use colored::Colorize;
use serde_json::{json, Value};
use stepwire_client::Client;
use stepwire_protocol::ProtoStepValue;

/// Executes a command and returns the formatted output.
pub async fn execute(
    client: &Client,
    cmd: Commands,
    as_json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::StepValue {
            texts,
            inline_table,
        } => {
            let mut resolved = Vec::with_capacity(texts.len());
            for text in &texts {
                let value = client.get_step_value_details(text, inline_table).await?;
                resolved.push(value);
            }

            if as_json {
                let items: Vec<Value> = texts
                    .iter()
                    .zip(&resolved)
                    .map(|(text, value)| {
                        let mut item = step_json(value);
                        item["step_text"] = json!(text);
                        item
                    })
                    .collect();
                return Ok(format_json(&Value::Array(items)));
            }

            let lines: Vec<String> = texts
                .iter()
                .zip(&resolved)
                .map(|(text, value)| format!("{} {} {}", text, "=>".dimmed(), value.step_value.cyan()))
                .collect();
            Ok(lines.join("\n"))
        }

        Commands::AllSteps => {
            let steps = client.get_all_steps().await?;

            if as_json {
                let items: Vec<Value> = steps.iter().map(step_json).collect();
                return Ok(format_json(&Value::Array(items)));
            }

            if steps.is_empty() {
                return Ok("No steps reported".yellow().to_string());
            }

            let mut output = format!("{} steps:", steps.len()).bold().to_string();
            for step in &steps {
                output.push_str(&format!("\n  {}", step.step_value.cyan()));
                if !step.parameters.is_empty() {
                    output.push_str(&format!(" ({})", step.parameters.join(", ").dimmed()));
                }
            }
            Ok(output)
        }
    }
}

fn step_json(step: &ProtoStepValue) -> Value {
    json!({
        "step_value": step.step_value,
        "parameterized_step_value": step.parameterized_step_value,
        "parameters": step.parameters,
    })
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
