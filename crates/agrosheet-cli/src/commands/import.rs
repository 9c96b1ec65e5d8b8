//! Import command implementation

use super::{print_worksheet, read_json};
use crate::cli::ImportArgs;
use crate::output::OutputWriter;
use crate::output_types::ImportOutput;
use agrosheet_core::config::LayeredConfig;
use agrosheet_core::models::crs::ReprojectionPolicy;
use agrosheet_worksheet::import::{import_feature_collection, ImportOptions};
use anyhow::{Context, Result};

pub async fn execute(args: ImportArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let doc = read_json(&args.path)?;
    let options = ImportOptions {
        policy: if args.strict { ReprojectionPolicy::Strict } else { config.reprojection.value },
    };

    let reprojector = crate::config::reprojector(config);
    let imported = import_feature_collection(&doc, &reprojector, &options).await?;

    for warning in &imported.warnings {
        output.warning(warning);
    }
    if imported.unconverted > 0 {
        output.warning(format!(
            "{} coordinate(s) were left in {}",
            imported.unconverted, imported.source_crs
        ));
    }

    if let Some(path) = &args.output {
        let content = serde_json::to_string_pretty(&imported.worksheet)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if output.is_json() {
        output.result(ImportOutput {
            source_crs: &imported.source_crs,
            features: imported.worksheet.features().len(),
            unconverted: imported.unconverted,
            warnings: &imported.warnings,
            worksheet: &imported.worksheet,
        })?;
    } else {
        output.kv("Source CRS", &imported.source_crs);
        print_worksheet(&imported.worksheet, output);
        if let Some(path) = &args.output {
            output.success(format!("Worksheet written to {}", path.display()));
        }
    }

    Ok(())
}
