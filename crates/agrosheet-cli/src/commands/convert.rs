//! Convert command implementation

use crate::cli::ConvertArgs;
use crate::output::OutputWriter;
use crate::output_types::ConvertOutput;
use agrosheet_core::config::{parse_epsg, LayeredConfig};
use agrosheet_core::models::crs::ReprojectionPolicy;
use agrosheet_geo::reproject::Conversion;
use anyhow::{bail, Result};

pub async fn execute(args: ConvertArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let from = parse_epsg(&args.from)?;
    let to = match &args.to {
        Some(to) => parse_epsg(to)?,
        None => config.target_crs.value,
    };
    let strict = args.strict || config.reprojection.value == ReprojectionPolicy::Strict;

    let reprojector = crate::config::reprojector(config);
    if let Err(e) = reprojector.prepare(from, to).await {
        if strict {
            return Err(e.into());
        }
        tracing::warn!("{}", e);
    }

    let conversion = reprojector.convert_or_original(args.x, args.y, from, to);
    let (x, y) = conversion.coordinates();
    let reason = match &conversion {
        Conversion::Converted { .. } => None,
        Conversion::Unconverted { reason, .. } => {
            if strict {
                bail!("{}", reason);
            }
            Some(reason.clone())
        }
    };

    if output.is_json() {
        output.result(ConvertOutput { from, to, x, y, converted: reason.is_none(), reason })?;
    } else {
        output.kv(format!("EPSG:{}", to), format!("{} {}", x, y));
        if let Some(reason) = reason {
            output.warning(format!("Returned the original coordinate: {}", reason));
        }
    }

    Ok(())
}
