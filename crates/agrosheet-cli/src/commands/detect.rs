//! Detect command implementation

use super::read_json;
use crate::cli::DetectArgs;
use crate::output::OutputWriter;
use crate::output_types::DetectOutput;
use agrosheet_geo::detect::detect;
use anyhow::Result;

pub fn execute(args: DetectArgs, output: &OutputWriter) -> Result<()> {
    let doc = read_json(&args.path)?;
    let descriptor = detect(&doc);

    if output.is_json() {
        output.result(DetectOutput {
            path: args.path.display().to_string(),
            epsg: descriptor.epsg,
            code: descriptor.code(),
            name: descriptor.name.clone(),
            kind: descriptor.kind,
        })?;
    } else {
        output.kv("CRS", descriptor.code());
        output.kv("Name", &descriptor.name);
        output.kv("Kind", format!("{:?}", descriptor.kind));
    }

    if !descriptor.is_known() {
        output.warning(format!(
            "{} is not a built-in CRS; converting it needs the definition service",
            descriptor.code()
        ));
    }

    Ok(())
}
