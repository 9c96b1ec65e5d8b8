//! Serializable payloads for JSON output

use agrosheet_core::config::ConfigSource;
use agrosheet_core::models::crs::{CrsDescriptor, CrsKind};
use agrosheet_core::models::Worksheet;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DetectOutput {
    pub path: String,
    pub epsg: u32,
    pub code: String,
    pub name: String,
    pub kind: CrsKind,
}

#[derive(Debug, Serialize)]
pub struct ConvertOutput {
    pub from: u32,
    pub to: u32,
    pub x: f64,
    pub y: f64,
    pub converted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportOutput<'a> {
    pub source_crs: &'a CrsDescriptor,
    pub features: usize,
    pub unconverted: usize,
    pub warnings: &'a [String],
    pub worksheet: &'a Worksheet,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: ConfigSource,
}
