pub mod act;
pub mod actions;
pub mod approve;
pub mod comment;
pub mod company;
pub mod completions;
pub mod edit;
pub mod list;
pub mod login;
pub mod queue;
pub mod quick;
pub mod resource;
pub mod shipment_status;
pub mod show;
pub mod summary;

use anyhow::{Context, Result};
use fieldops_core::form::FormData;
use serde_json::Value;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use crate::validate;

/// Display placeholder for missing values.
pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn confirm_with(
    assume_yes: bool,
    question: &str,
    interactive: bool,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<()> {
    if assume_yes {
        return Ok(());
    }
    if !interactive {
        anyhow::bail!("{question} Re-run with --yes to confirm.");
    }
    write!(prompt, "{question} [y/N] ")?;
    prompt.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => anyhow::bail!("Cancelled"),
    }
}

/// Ask before a destructive or archiving action. Without a terminal the
/// caller must pass `--yes`.
pub fn confirm(assume_yes: bool, question: &str) -> Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut input = stdin.lock();
    confirm_with(assume_yes, question, interactive, &mut input, &mut io::stderr())
}

/// Form data from an optional JSON file with `--set` pairs applied on top.
pub fn load_form(file: Option<&Path>, sets: &[String]) -> Result<FormData> {
    let mut data = match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str::<Value>(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("{} must contain a JSON object", path.display()),
            }
        }
        None => FormData::new(),
    };
    for (key, value) in validate::parse_assignments(sets)? {
        data.insert(key, value);
    }
    Ok(data)
}
