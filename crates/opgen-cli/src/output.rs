//! Output formatting and reporting

use colored::*;
use opgen_core::{GenerationSummary, OpgenError, RegenerationReport, Result};

use crate::OutputFormat;

/// Prints the summary of a generation run
pub struct SummaryPrinter {
    format: OutputFormat,
}

impl SummaryPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn print(&self, summary: &GenerationSummary) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                print!("{}", render_human(summary));
                Ok(())
            }
            OutputFormat::Json => {
                let content = serde_json::to_string_pretty(summary).map_err(|e| {
                    OpgenError::configuration(format!("Failed to serialize summary: {e}"))
                })?;
                println!("{content}");
                Ok(())
            }
        }
    }
}

/// Human-readable summary block
pub fn render_human(summary: &GenerationSummary) -> String {
    let status = if summary.written {
        format!("{} {}", "Updated".green().bold(), summary.grammar.display())
    } else {
        format!("{} {}", "Unchanged".cyan().bold(), summary.grammar.display())
    };

    let mut out = format!("{status}\n\n{}\n", "Summary:".bold());
    out.push_str(&format!("  Install dirs:      {}\n", summary.install_dirs));
    out.push_str(&format!("  Core files:        {}\n", summary.core_files));
    out.push_str(&format!("  Application files: {}\n", summary.application_files));
    out.push_str(&format!("  Header files:      {}\n", summary.header_files));
    out.push_str(&format!("  Namespaces:        {}\n", summary.namespaces));
    out.push_str(&format!("  Types:             {}\n", summary.types));
    out.push_str(&format!("  Functions:         {}\n", summary.functions));
    out.push_str(&format!("  Chunks:            {}\n", summary.chunks));
    out
}

/// Report of one run in watch mode
pub fn print_report(report: &RegenerationReport) {
    match (&report.summary, report.success) {
        (Some(summary), true) => print!("{}", render_human(summary)),
        _ => {
            eprintln!("{} {}", "error:".red().bold(), report.message());
            eprintln!("   Waiting for the next change...");
        }
    }
}
