//! Rendering of command results as text, JSON or YAML

use anyhow::Result;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::domain::entities::change_log::ChangeLogSet;
use crate::domain::entities::scm_result::{BlameLine, CommandPayload, CommandResult};
use crate::domain::entities::scm_file::ScmFile;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// Render any serializable value as JSON or YAML
pub fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        OutputFormat::Text => Err(anyhow::anyhow!("text output is not structured")),
    }
}

fn status_label(status: ScmFileStatus) -> ColoredString {
    let label = format!("{:<11}", status.as_str());
    match status {
        ScmFileStatus::Added | ScmFileStatus::CheckedIn => label.green(),
        ScmFileStatus::Modified | ScmFileStatus::Updated | ScmFileStatus::Patched => {
            label.yellow()
        }
        ScmFileStatus::Deleted | ScmFileStatus::Conflict => label.red(),
        ScmFileStatus::Renamed | ScmFileStatus::Copied => label.cyan(),
        ScmFileStatus::Unknown => label.dimmed(),
        ScmFileStatus::CheckedOut | ScmFileStatus::Tagged => label.blue(),
    }
}

fn render_files(files: &[ScmFile], out: &mut String) {
    for file in files {
        out.push_str(&format!("{} {}\n", status_label(file.status), file.path));
    }
}

fn render_blame(lines: &[BlameLine], out: &mut String) {
    for (number, line) in lines.iter().enumerate() {
        let date = line
            .date
            .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{:>5} {:<10} {:<16} {}\n",
            number + 1,
            line.revision.yellow(),
            line.author,
            date.dimmed()
        ));
    }
}

fn render_change_log(change_log: &ChangeLogSet, out: &mut String) {
    for change_set in &change_log.change_sets {
        let key = change_set.key.as_deref().unwrap_or("-");
        let author = change_set.author.as_deref().unwrap_or("unknown");
        let date = change_set
            .date
            .map(|date| date.to_rfc3339())
            .unwrap_or_default();
        out.push_str(&format!("{} {} {}\n", key.yellow().bold(), author, date.dimmed()));
        for line in change_set.comment.lines() {
            out.push_str(&format!("    {}\n", line));
        }
        for file in &change_set.files {
            out.push_str(&format!("  {} {}\n", status_label(file.status), file.path));
        }
        out.push('\n');
    }
}

/// Human-readable rendering of a command result
pub fn render_text(result: &CommandResult) -> String {
    let mut out = String::new();

    if !result.is_success() {
        out.push_str(&format!(
            "{} {}\n",
            "✗".red().bold(),
            result
                .result
                .provider_message
                .as_deref()
                .unwrap_or("The command failed.")
        ));
        if let Some(output) = result.result.command_output.as_deref() {
            for line in output.lines() {
                out.push_str(&format!("  {}\n", line.red()));
            }
        }
        return out;
    }

    match &result.payload {
        CommandPayload::Empty => {
            out.push_str(&format!("{} {} completed\n", "✓".green().bold(), result.kind));
        }
        CommandPayload::Files(files) if files.is_empty() => {
            out.push_str(&format!("{} no files reported\n", "✓".green().bold()));
        }
        CommandPayload::Files(files) => render_files(files, &mut out),
        CommandPayload::Diff(diff) => out.push_str(&diff.patch),
        CommandPayload::Blame(lines) => render_blame(lines, &mut out),
        CommandPayload::ChangeLog(change_log) => render_change_log(change_log, &mut out),
    }
    out
}

/// Render `result` in `format`
pub fn render(result: &CommandResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(result)),
        structured => render_structured(result, structured),
    }
}
