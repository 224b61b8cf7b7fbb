//! Per-run diagnostics collector.
//!
//! Collaborator failures, schema surprises and rule errors never abort a run.
//! They are recorded here, logged as they happen, and handed back to the caller
//! once the run completes. Create one collector per run.

use colored::Colorize;
use serde::Serialize;
use std::fmt;

/// One recorded problem.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Resource the problem belongs to, if any.
    pub resource_id: Option<String>,
    /// Where it happened, e.g. `catalog`, `enrich`, `rule:web_server_farm`.
    pub context: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_id {
            Some(id) => write!(f, "[{}] {} ({})", self.context, self.message, id),
            None => write!(f, "[{}] {}", self.context, self.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    /// Record and log a problem.
    pub fn record(&mut self, resource_id: Option<&str>, context: &str, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            resource_id: resource_id.map(str::to_string),
            context: context.to_string(),
            message: message.into(),
        };
        log::warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Entries recorded under `context`.
    pub fn in_context<'a>(&'a self, context: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries.iter().filter(move |d| d.context == context)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Print all entries at the end of a run.
    pub fn print_summary(&self) {
        if self.entries.is_empty() {
            log::info!("No diagnostics recorded.");
            return;
        }
        println!(
            "{} {} diagnostic(s) recorded:",
            "WARN".on_yellow(),
            self.entries.len()
        );
        for diagnostic in &self.entries {
            println!("  - {diagnostic}");
        }
    }
}
