#![cfg(feature = "json_schema")]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsonschema::{Draft, JSONSchema};
use radfilter::core::FilterGroup;
use schemars::schema_for;
use std::{fs, path::PathBuf};

/// Generate the JSON Schema for FilterGroup or validate a filter file against it.
#[derive(Parser, Debug)]
#[command(name = "filter-schema", about = "FilterGroup schema generator and validator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the FilterGroup JSON schema (or write it to a file)
    Schema {
        /// Optional output path for the schema JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a JSON or YAML filter file against the FilterGroup schema
    Validate {
        /// Path to the filter file to validate
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Schema { output } => {
            let schema = schema_for!(FilterGroup);
            let json = serde_json::to_string_pretty(&schema)?;

            if let Some(path) = output {
                fs::write(&path, json)?;
                eprintln!("Wrote schema to {}", path.display());
            } else {
                println!("{json}");
            }
        }
        Command::Validate { file } => {
            let schema = schema_for!(FilterGroup);
            // jsonschema keeps a reference to the schema; leak a small boxed value to satisfy 'static.
            let schema_json = serde_json::to_value(schema)?;
            let schema_ref: &'static serde_json::Value = Box::leak(Box::new(schema_json));
            let compiled = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(schema_ref)
                .context("failed to compile FilterGroup schema")?;

            let text = fs::read_to_string(&file).context("failed to read filter file")?;
            let is_yaml = file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
            let document: serde_json::Value = if is_yaml {
                serde_yaml::from_str(&text).context("failed to parse YAML")?
            } else {
                serde_json::from_str(&text).context("failed to parse JSON")?
            };

            if let Err(errors) = compiled.validate(&document) {
                eprintln!("Validation errors for {}:", file.display());
                for err in errors {
                    eprintln!("- {} at {}", err, err.instance_path);
                }
                std::process::exit(1);
            }

            let group: FilterGroup = serde_json::from_value(document)
                .context("document matches the schema but is not a FilterGroup")?;
            println!(
                "{} is a valid filter ({} conditions, depth {})",
                file.display(),
                group.active_filter_count(),
                group.depth()
            );
        }
    }

    Ok(())
}
