//! Export command implementation

use super::read_json;
use crate::cli::ExportArgs;
use crate::output::OutputWriter;
use agrosheet_core::config::{parse_epsg, LayeredConfig};
use agrosheet_worksheet::export::{export_feature_collection, write_export};
use agrosheet_worksheet::normalize::normalize;
use anyhow::{Context, Result};

pub async fn execute(args: ExportArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let raw = read_json(&args.path)?;
    let worksheet = normalize(&raw)?;
    let target = match &args.crs {
        Some(crs) => parse_epsg(crs)?,
        None => config.target_crs.value,
    };

    let reprojector = crate::config::reprojector(config);
    let collection = export_feature_collection(&worksheet, target, &reprojector).await?;

    match &args.output {
        Some(path) => {
            write_export(path, &collection)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(format!(
                "Exported {} feature(s) as EPSG:{} to {}",
                worksheet.features().len(),
                target,
                path.display()
            ));
        }
        None => output.document(&collection)?,
    }

    Ok(())
}
