//! Rendering of command results as tables, JSON or YAML.

use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use jobwire_core::value::{Mapping, Value};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable tables and key lists
    #[default]
    Table,
    Json,
    Yaml,
}

pub fn print_success(msg: &str) {
    println!("{} {}", "ok".green().bold(), msg);
}

/// Written to stderr.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

/// Rows as a table, or `empty` dimmed when there are none.
pub fn print_table<T: Tabled>(rows: &[T], empty: &str) {
    if rows.is_empty() {
        println!("{}", empty.dimmed());
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
}

/// Serialize `item` as a document; table mode falls back to JSON.
pub fn print_item<T: Serialize + ?Sized>(item: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(item)?,
        OutputFormat::Table | OutputFormat::Json => serde_json::to_string_pretty(item)? + "\n",
    };
    print!("{}", rendered);
    Ok(())
}

/// A mapping under `title`, one key per line in insertion order.
pub fn print_mapping(title: &str, map: &Mapping, format: OutputFormat) -> Result<()> {
    if !matches!(format, OutputFormat::Table) {
        return print_item(map, format);
    }

    print_header(title);
    if map.is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for (key, value) in map {
        print_detail(key, &describe(value));
    }
    Ok(())
}

fn describe(value: &Value) -> String {
    match value {
        Value::DateTime(_) => format!("{} {}", value, "(datetime)".dimmed()),
        Value::Text(text) => format!("{:?}", text),
        _ => value.to_string(),
    }
}

pub fn print_detail(key: &str, value: &str) {
    println!("  {} {}", format!("{}:", key).cyan(), value);
}

pub fn print_header(title: &str) {
    println!("\n{}", title.bold());
}
