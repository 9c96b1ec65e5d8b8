//! Integration tests for output formatting
//!
//! These tests run the `agrosheet` binary and verify its JSON output.

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const TM06_UPLOAD: &str = r#"{
    "type": "FeatureCollection",
    "crs": {"type": "name", "properties": {"name": "EPSG:3763"}},
    "metadata": {"id": "12", "title": "Orchard"},
    "features": [
        {
            "type": "Feature",
            "properties": {"polygon_id": "A1", "aigp": "G1"},
            "geometry": {"type": "Polygon", "coordinates": [[
                [-84000.0, 160000.0], [-83000.0, 160000.0], [-83000.0, 161000.0], [-84000.0, 160000.0]
            ]]}
        }
    ]
}"#;

const BACKEND_WORKSHEET: &str = r#"{
    "id": 12,
    "title": "Orchard",
    "aigp": "G1,G2",
    "operations": [{"operation_code": "P1", "operation_description": "Pruning", "area_ha": "1.5"}],
    "features": "[{\"type\": \"Feature\", \"properties\": {\"polygon_id\": \"A1\", \"aigp\": \"G1\"}, \"geometry\": {\"type\": \"Point\", \"coordinates\": [-9.13308, 41.10481]}}]"
}"#;

fn run(dir: &Path, args: &[&str]) -> Output {
    run_with_env(dir, args, &[])
}

fn run_with_env(dir: &Path, args: &[&str], vars: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_agrosheet"))
        .current_dir(dir)
        .env_remove("AGROSHEET_TARGET_CRS")
        .env_remove("AGROSHEET_REPROJECTION")
        .env_remove("AGROSHEET_DEFINITION_URL")
        .envs(vars.iter().copied())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn json_stdout(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_detect_json_output() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("upload.geojson"), TM06_UPLOAD).unwrap();

    let parsed = json_stdout(&run(dir.path(), &["detect", "upload.geojson", "--json"]));
    assert_eq!(parsed["status"], "success");
    assert_eq!(parsed["data"]["epsg"], 3763);
    assert_eq!(parsed["data"]["kind"], "projected");
}

#[test]
fn test_convert_json_output() {
    let dir = TempDir::new().unwrap();
    let parsed = json_stdout(&run(
        dir.path(),
        &["convert", "--from", "EPSG:3763", "--to", "4326", "--json", "--", "-84000", "160000"],
    ));

    assert_eq!(parsed["data"]["converted"], true);
    let lon = parsed["data"]["x"].as_f64().unwrap();
    let lat = parsed["data"]["y"].as_f64().unwrap();
    assert!((lon - -9.13308).abs() < 1e-4);
    assert!((lat - 41.10481).abs() < 1e-4);
}

#[test]
fn test_normalize_backend_form() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("worksheet.json"), BACKEND_WORKSHEET).unwrap();

    let parsed = json_stdout(&run(dir.path(), &["normalize", "worksheet.json", "--backend"]));
    assert_eq!(parsed["id"], "12");
    assert_eq!(parsed["aigp"], serde_json::json!(["G1", "G2"]));
    assert_eq!(parsed["operations"][0]["code"], "P1");
    assert_eq!(parsed["operations"][0]["area"], 1.5);
    assert_eq!(parsed["features"][0]["id"], "A1");
}

#[test]
fn test_import_json_output() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("upload.geojson"), TM06_UPLOAD).unwrap();

    let parsed = json_stdout(&run(dir.path(), &["import", "upload.geojson", "--json"]));
    let data = &parsed["data"];
    assert_eq!(data["source_crs"]["epsg"], 3763);
    assert_eq!(data["features"], 1);
    assert_eq!(data["unconverted"], 0);
    assert_eq!(data["worksheet"]["title"], "Orchard");
    assert_eq!(data["worksheet"]["aigp"]["G1"], 1);
}

#[test]
fn test_import_keeps_wgs84_whatever_the_export_crs() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("upload.geojson"), TM06_UPLOAD).unwrap();
    let vars = [("AGROSHEET_TARGET_CRS", "3763")];

    let imported = json_stdout(&run_with_env(
        dir.path(),
        &["import", "upload.geojson", "--output", "worksheet.json", "--json"],
        &vars,
    ));
    let lon = imported["data"]["worksheet"]["features"]["A1"]["geometry"]["coordinates"][0][0][0]
        .as_f64()
        .unwrap();
    assert!((lon - -9.13308).abs() < 1e-4, "lon = {}", lon);

    let output = run_with_env(dir.path(), &["export", "worksheet.json", "-o", "out.geojson"], &vars);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let written = std::fs::read_to_string(dir.path().join("out.geojson")).unwrap();
    let collection: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(collection["crs"]["properties"]["name"], "EPSG:3763");
    let x = collection["features"][0]["geometry"]["coordinates"][0][0][0].as_f64().unwrap();
    assert!((x - -84000.0).abs() < 1e-3, "x = {}", x);
}

#[test]
fn test_export_writes_collection() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("worksheet.json"), BACKEND_WORKSHEET).unwrap();

    let output = run(
        dir.path(),
        &["export", "worksheet.json", "--crs", "3763", "--output", "out.geojson"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let written = std::fs::read_to_string(dir.path().join("out.geojson")).unwrap();
    let collection: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(collection["crs"]["properties"]["name"], "EPSG:3763");
    assert_eq!(collection["metadata"]["title"], "Orchard");
    let x = collection["features"][0]["geometry"]["coordinates"][0].as_f64().unwrap();
    assert!((x - -84000.0).abs() < 1.0);
}

#[test]
fn test_malformed_upload_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bad.geojson"), r#"{"type": "Feature"}"#).unwrap();

    let output = run(dir.path(), &["import", "bad.geojson"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FeatureCollection"));
}

#[test]
fn test_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("agrosheet.toml"), "target_crs = 3763\n").unwrap();

    let parsed = json_stdout(&run(dir.path(), &["config", "--json"]));
    let entries = parsed["data"].as_array().unwrap();
    let target = entries.iter().find(|entry| entry["key"] == "target_crs").unwrap();
    assert_eq!(target["value"], "EPSG:3763");
    assert_eq!(target["source"], "File");
}
