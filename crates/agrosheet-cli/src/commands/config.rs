//! Config command implementation

use crate::output::OutputWriter;
use crate::output_types::ConfigEntry;
use agrosheet_core::config::LayeredConfig;
use anyhow::Result;
use tabled::Tabled;

pub fn execute(config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry { key, value, source })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        return output.result(entries);
    }

    #[derive(Tabled)]
    struct ConfigRow {
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    output.section("Configuration");
    output.table(
        entries
            .into_iter()
            .map(|entry| ConfigRow {
                key: entry.key,
                value: entry.value,
                source: format!("{:?}", entry.source),
            })
            .collect(),
    );

    Ok(())
}
