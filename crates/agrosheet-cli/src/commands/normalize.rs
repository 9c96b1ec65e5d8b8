//! Normalize command implementation

use super::{print_worksheet, read_json};
use crate::cli::NormalizeArgs;
use crate::output::OutputWriter;
use agrosheet_worksheet::normalize::{denormalize, normalize};
use anyhow::Result;

pub fn execute(args: NormalizeArgs, output: &OutputWriter) -> Result<()> {
    let raw = read_json(&args.path)?;
    let worksheet = normalize(&raw)?;

    if args.backend {
        output.document(&denormalize(&worksheet))?;
    } else if output.is_json() {
        output.result(&worksheet)?;
    } else {
        print_worksheet(&worksheet, output);
    }

    Ok(())
}
