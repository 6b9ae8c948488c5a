//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;
use serde_json::{json, Value};

use docstash_core::{DocumentSnapshot, QuerySnapshot, StoreConfig};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single document with all of its fields
    pub fn print_document(&self, doc: &DocumentSnapshot) -> Result<()> {
        let data = Value::Object(doc.data().cloned().unwrap_or_default());

        match self.format {
            OutputFormat::Human => {
                println!("ID:   {}", doc.id());
                println!("Path: {}", doc.reference().path());
                println!();
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&document_json(doc))?);
            }
            OutputFormat::Quiet => {
                println!("{}", doc.id());
            }
        }
        Ok(())
    }

    /// Print query results, one line per document
    pub fn print_documents(&self, snapshot: &QuerySnapshot) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if snapshot.is_empty() {
                    println!("No documents found.");
                    return Ok(());
                }
                for doc in snapshot {
                    let data = Value::Object(doc.data().cloned().unwrap_or_default());
                    println!(
                        "{} | {}",
                        truncate(doc.id(), 22),
                        truncate(&serde_json::to_string(&data)?, 70)
                    );
                }
                println!("\n{} document(s)", snapshot.size());
            }
            OutputFormat::Json => {
                let docs: Vec<Value> = snapshot.iter().map(document_json).collect();
                println!("{}", serde_json::to_string_pretty(&docs)?);
            }
            OutputFormat::Quiet => {
                for doc in snapshot {
                    println!("{}", doc.id());
                }
            }
        }
        Ok(())
    }

    /// Print the result of a count aggregation
    pub fn print_count(&self, count: usize) {
        match self.format {
            OutputFormat::Human => println!("{} document(s) match", count),
            OutputFormat::Json => println!("{}", json!({ "count": count })),
            OutputFormat::Quiet => println!("{}", count),
        }
    }

    /// Print the effective configuration
    pub fn print_config(&self, config: &StoreConfig, source: &str) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    json!({
                        "max_batch_writes": config.max_batch_writes,
                        "seed_file": config.seed_file,
                        "config_file": source,
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", config.max_batch_writes);
            }
            OutputFormat::Human => {
                println!("Configuration:");
                println!("  max_batch_writes: {}", config.max_batch_writes);
                println!(
                    "  seed_file:        {}",
                    config
                        .seed_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(not set)".to_string())
                );
                println!();
                println!("Config file: {}", source);
            }
        }
    }
}

fn document_json(doc: &DocumentSnapshot) -> Value {
    json!({
        "id": doc.id(),
        "path": doc.reference().path(),
        "data": doc.data(),
    })
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
