use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agrosheet - worksheet geometry normalization and reprojection
#[derive(Parser, Debug)]
#[command(name = "agrosheet")]
#[command(about = "Worksheet geometry normalization and reprojection", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./agrosheet.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the projection-definition service
    #[arg(long, global = true, value_name = "URL")]
    pub definition_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the CRS of a GeoJSON document
    Detect(DetectArgs),

    /// Convert one coordinate between CRSs
    Convert(ConvertArgs),

    /// Normalize a backend worksheet
    Normalize(NormalizeArgs),

    /// Import an uploaded FeatureCollection as a worksheet
    Import(ImportArgs),

    /// Export a backend worksheet as a GeoJSON FeatureCollection
    Export(ExportArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Path to the GeoJSON file
    pub path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Easting or longitude
    #[arg(allow_hyphen_values = true)]
    pub x: f64,

    /// Northing or latitude
    #[arg(allow_hyphen_values = true)]
    pub y: f64,

    /// Source CRS (e.g., 3763 or EPSG:3763)
    #[arg(long)]
    pub from: String,

    /// Target CRS (defaults to the configured target CRS)
    #[arg(long)]
    pub to: Option<String>,

    /// Fail instead of returning the original coordinate
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct NormalizeArgs {
    /// Path to the backend worksheet JSON
    pub path: PathBuf,

    /// Print the submission form instead of the keyed form
    #[arg(long)]
    pub backend: bool,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Path to the uploaded FeatureCollection
    pub path: PathBuf,

    /// Abort on the first coordinate that cannot be converted
    #[arg(long)]
    pub strict: bool,

    /// Write the normalized worksheet to this file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Path to the backend worksheet JSON
    pub path: PathBuf,

    /// Target CRS of the exported coordinates (defaults to the configured target CRS)
    #[arg(long)]
    pub crs: Option<String>,

    /// Output file (prints to stdout when omitted)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}
