//! Command implementations

mod config;
mod convert;
mod detect;
mod export;
mod import;
mod normalize;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use agrosheet_core::models::Worksheet;
use agrosheet_geo::transform::{kind_name, position_count};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tabled::Tabled;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let settings = crate::config::load(&cli)?;

    match cli.command {
        Commands::Detect(args) => detect::execute(args, &output),
        Commands::Convert(args) => convert::execute(args, &settings, &output).await,
        Commands::Normalize(args) => normalize::execute(args, &output),
        Commands::Import(args) => import::execute(args, &settings, &output).await,
        Commands::Export(args) => export::execute(args, &settings, &output).await,
        Commands::Config => config::execute(&settings, &output),
    }
}

/// Read a JSON file
fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Human-readable overview of a worksheet
fn print_worksheet(worksheet: &Worksheet, output: &OutputWriter) {
    output.section("Worksheet");
    for (field, value) in worksheet.metadata.fields().filter(|(_, value)| !value.is_empty()) {
        output.kv(field, value);
    }

    output.section("Operations");

    #[derive(Tabled)]
    struct OperationRow {
        #[tabled(rename = "Code")]
        code: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Area (ha)")]
        area: f64,
    }

    output.table(
        worksheet
            .operations
            .iter()
            .map(|op| OperationRow {
                code: op.code.clone(),
                description: op.description.clone(),
                area: op.area,
            })
            .collect(),
    );

    output.section("AIGP");

    #[derive(Tabled)]
    struct AigpRow {
        #[tabled(rename = "Label")]
        label: String,
        #[tabled(rename = "Features")]
        usage: String,
    }

    output.table(
        worksheet
            .aigp()
            .iter()
            .map(|(label, usage)| AigpRow {
                label: label.clone(),
                usage: if usage.is_unused() { "unused".to_string() } else { usage.count().to_string() },
            })
            .collect(),
    );

    output.section("Features");

    #[derive(Tabled)]
    struct FeatureRow {
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Geometry")]
        kind: String,
        #[tabled(rename = "Positions")]
        positions: usize,
        #[tabled(rename = "AIGP")]
        aigp: String,
    }

    output.table(
        worksheet
            .features()
            .values()
            .map(|feature| FeatureRow {
                key: feature.key.to_string(),
                kind: kind_name(&feature.geometry.value).to_string(),
                positions: position_count(&feature.geometry.value),
                aigp: feature.aigp().unwrap_or("-").to_string(),
            })
            .collect(),
    );
}
