//! Output formatting utilities

use crate::script::StepOutcome;
use colored::*;
use pod_types::PodEvent;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Everything a script run produced
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub steps: &'a [StepOutcome],
    pub events: &'a [PodEvent],
}

pub fn print_report(report: &Report<'_>, format: OutputFormat) -> serde_json::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for step in report.steps {
                let line = match &step.detail {
                    Some(detail) => format!("[{}] {}: {}", step.step, step.op, detail),
                    None => format!("[{}] {}", step.step, step.op),
                };
                if step.ok {
                    print_success(&line);
                } else {
                    print_rejected(&line);
                }
            }
            print_info(&format!("{} events recorded", report.events.len()));
        }
    }
    Ok(())
}

pub fn print_single<T: Serialize>(data: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// A step that failed the way the script said it would
pub fn print_rejected(message: &str) {
    println!("{} {}", "⊘".yellow(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_steps_and_events() {
        let steps = vec![StepOutcome {
            step: 0,
            op: "deploy_controller".to_string(),
            ok: true,
            detail: None,
        }];
        let report = Report {
            steps: &steps,
            events: &[],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["op"], "deploy_controller");
        assert!(json["steps"][0].get("detail").is_none());
        assert_eq!(json["events"].as_array().unwrap().len(), 0);
    }
}
