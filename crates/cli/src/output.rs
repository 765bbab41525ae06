//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use testpilot_e2e::{RunSummary, ScenarioResult, Step, StepResult, StepStatus};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;

    /// Colour for the whole row, if any
    fn row_color(&self) -> Option<Color> {
        None
    }
}

impl TableDisplay for Step {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Action", "Target", "Value", "Expect"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.action.to_string(),
            self.target.clone(),
            self.value.clone(),
            self.expect.clone(),
        ]
    }
}

impl TableDisplay for StepResult {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Step", "Status", "Duration", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.status.to_string(),
            format!("{:.2}s", self.duration),
            self.message.clone(),
        ]
    }

    fn row_color(&self) -> Option<Color> {
        match self.status {
            StepStatus::Passed => None,
            StepStatus::Failed => Some(Color::Red),
            StepStatus::Skipped => Some(Color::Yellow),
        }
    }
}

impl TableDisplay for ScenarioResult {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Status", "Steps", "Duration", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.status.to_string(),
            self.steps.len().to_string(),
            format!("{:.2}s", self.duration),
            self.error_message.clone().unwrap_or_default(),
        ]
    }

    fn row_color(&self) -> Option<Color> {
        (!self.passed()).then_some(Color::Red)
    }
}

fn to_text<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        _ => serde_json::to_string_pretty(value)?,
    })
}

fn table_of<'a, T: TableDisplay + 'a>(items: impl IntoIterator<Item = &'a T>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(T::headers());
    for item in items {
        let color = item.row_color();
        table.add_row(item.row().into_iter().map(|value| match color {
            Some(c) => Cell::new(value).fg(c),
            None => Cell::new(value),
        }));
    }
    table
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No items found.");
            } else {
                println!("{}", table_of(items));
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            println!("{}", to_text(items, format)?);
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
    Ok(())
}

/// Print any serializable value as YAML, or pretty JSON for every other
/// format.
pub fn print_value<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", to_text(value, format)?);
    Ok(())
}

/// Print a run summary: one step table per scenario, then the totals line.
pub fn print_summary(summary: &RunSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Yaml => return print_value(summary, format),
        OutputFormat::Table => {
            for scenario in &summary.scenarios {
                println!("{}", scenario_heading(scenario));
                println!("{}", table_of(&scenario.steps));
            }
            if summary.scenarios.len() > 1 {
                println!("{}", table_of(&summary.scenarios));
            }
        }
        OutputFormat::Plain => {
            for scenario in &summary.scenarios {
                println!("{}", scenario_heading(scenario));
                for step in &scenario.steps {
                    println!("  [{}] {} - {}", step.status, step.name, step.message);
                }
            }
        }
    }

    println!();
    let totals = format!(
        "{} total, {} passed, {} failed ({:.2}s)",
        summary.total, summary.passed, summary.failed, summary.duration
    );
    if summary.all_passed() {
        print_success(&totals);
    } else {
        print_error(&totals);
    }
    Ok(())
}

fn scenario_heading(scenario: &ScenarioResult) -> String {
    let mark = if scenario.passed() {
        "✓".green()
    } else {
        "✗".red()
    };
    format!("{} {} ({:.2}s)", mark, scenario.name.bold(), scenario.duration)
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
