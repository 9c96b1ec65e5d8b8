//! In-memory worksheet model.
//!
//! A worksheet is the editable, keyed form of a backend work order: flat
//! metadata, planned operations, declared AIGP labels with their usage
//! counts, and the land-parcel features indexed by a unique key.

use crate::error::{AgroError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Feature property holding the AIGP label
pub const AIGP_PROPERTY: &str = "aigp";

/// Feature properties that carry the feature key on the wire, first present wins
pub const KEY_PROPERTIES: &[&str] = &["polygon_id", "id"];

/// Count written for a label that is declared but not used by any feature
pub const AIGP_UNUSED_SENTINEL: u64 = 9_007_199_254_740_991;

/// Usage of one AIGP label across a worksheet's features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AigpUsage {
    /// Declared on the worksheet but no feature carries it yet
    Unused,
    /// Number of features carrying the label
    Used(usize),
}

impl AigpUsage {
    /// Count as exchanged with the client, with the sentinel for unused labels
    pub fn count(&self) -> u64 {
        match self {
            AigpUsage::Unused => AIGP_UNUSED_SENTINEL,
            AigpUsage::Used(n) => *n as u64,
        }
    }

    pub fn from_count(count: u64) -> Self {
        if count == 0 || count >= AIGP_UNUSED_SENTINEL {
            AigpUsage::Unused
        } else {
            AigpUsage::Used(count as usize)
        }
    }

    pub fn is_unused(&self) -> bool {
        matches!(self, AigpUsage::Unused)
    }
}

impl Serialize for AigpUsage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.count())
    }
}

impl<'de> Deserialize<'de> for AigpUsage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u64::deserialize(deserializer).map(AigpUsage::from_count)
    }
}

/// Key of a feature, unique within its worksheet
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureKey(String);

impl FeatureKey {
    /// Key from text, without surrounding whitespace
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.trim().len() == key.len() {
            Self(key)
        } else {
            Self(key.trim().to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for FeatureKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// One land parcel: geometry plus descriptive properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub key: FeatureKey,
    pub geometry: geojson::Geometry,
    #[serde(default)]
    pub properties: JsonObject,
}

impl Feature {
    pub fn new(key: impl Into<FeatureKey>, geometry: geojson::Geometry) -> Self {
        Self { key: key.into(), geometry, properties: JsonObject::new() }
    }

    /// Set a property, builder style
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The AIGP label this feature belongs to, if any
    pub fn aigp(&self) -> Option<&str> {
        self.properties
            .get(AIGP_PROPERTY)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    /// Property that identifies this feature on the wire, with its key text
    pub fn identity_property(&self) -> Option<(&'static str, String)> {
        KEY_PROPERTIES
            .iter()
            .find_map(|name| key_text(self.properties.get(*name)).map(|text| (*name, text)))
    }

    /// Rewrite the identifying property so it names this feature's key
    fn align_identity(&mut self) {
        let Some((name, text)) = self.identity_property() else {
            return;
        };
        if text != self.key.as_str() {
            let numeric = self.properties.get(name).is_some_and(Value::is_number);
            self.properties.insert(name.to_string(), key_value(&self.key, numeric));
        }
    }
}

/// Planned operation on the worksheet's parcels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub code: String,
    pub description: String,
    /// Area in hectares
    pub area: f64,
}

/// Flat scalar metadata of a worksheet, all text and empty when absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorksheetMetadata {
    pub id: String,
    pub title: String,
    pub status: String,
    pub issue_date: String,
    pub award_date: String,
    pub starting_date: String,
    pub finishing_date: String,
    pub service_provider_id: String,
    pub issuing_user_id: String,
    pub posa_code: String,
    pub posa_description: String,
    pub posp_code: String,
    pub posp_description: String,
}

impl WorksheetMetadata {
    /// Wire names of every metadata field, in backend order
    pub const FIELDS: &'static [&'static str] = &[
        "id",
        "title",
        "status",
        "issue_date",
        "award_date",
        "starting_date",
        "finishing_date",
        "service_provider_id",
        "issuing_user_id",
        "posa_code",
        "posa_description",
        "posp_code",
        "posp_description",
    ];

    fn slot(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "id" => Some(&mut self.id),
            "title" => Some(&mut self.title),
            "status" => Some(&mut self.status),
            "issue_date" => Some(&mut self.issue_date),
            "award_date" => Some(&mut self.award_date),
            "starting_date" => Some(&mut self.starting_date),
            "finishing_date" => Some(&mut self.finishing_date),
            "service_provider_id" => Some(&mut self.service_provider_id),
            "issuing_user_id" => Some(&mut self.issuing_user_id),
            "posa_code" => Some(&mut self.posa_code),
            "posa_description" => Some(&mut self.posa_description),
            "posp_code" => Some(&mut self.posp_code),
            "posp_description" => Some(&mut self.posp_description),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match field {
            "id" => &self.id,
            "title" => &self.title,
            "status" => &self.status,
            "issue_date" => &self.issue_date,
            "award_date" => &self.award_date,
            "starting_date" => &self.starting_date,
            "finishing_date" => &self.finishing_date,
            "service_provider_id" => &self.service_provider_id,
            "issuing_user_id" => &self.issuing_user_id,
            "posa_code" => &self.posa_code,
            "posa_description" => &self.posa_description,
            "posp_code" => &self.posp_code,
            "posp_description" => &self.posp_description,
            _ => return None,
        };
        Some(value)
    }

    /// Set a field by wire name. Returns false for names that are not metadata.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        match self.slot(field) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// (name, value) pairs in backend order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        Self::FIELDS.iter().filter_map(move |name| self.get(name).map(|value| (*name, value)))
    }
}

/// Editable worksheet.
///
/// `aigp` and `features` are kept private so every mutation goes through
/// methods that keep the usage counts equal to the number of features
/// carrying each label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Worksheet {
    #[serde(flatten)]
    pub metadata: WorksheetMetadata,
    pub operations: Vec<Operation>,
    aigp: BTreeMap<String, AigpUsage>,
    features: BTreeMap<FeatureKey, Feature>,
}

impl Worksheet {
    /// Build a worksheet, rejecting duplicate feature keys
    pub fn new(
        metadata: WorksheetMetadata,
        operations: Vec<Operation>,
        declared_aigp: impl IntoIterator<Item = String>,
        features: impl IntoIterator<Item = Feature>,
    ) -> Result<Self> {
        let mut worksheet = Self { metadata, operations, ..Default::default() };
        for mut feature in features {
            check_key(&feature.key)?;
            feature.align_identity();
            if worksheet.features.contains_key(&feature.key) {
                return Err(AgroError::DuplicateFeatureKey { key: feature.key.to_string() });
            }
            worksheet.features.insert(feature.key.clone(), feature);
        }
        for label in declared_aigp {
            worksheet.declare_aigp(label);
        }
        worksheet.recount_aigp();
        Ok(worksheet)
    }

    pub fn features(&self) -> &BTreeMap<FeatureKey, Feature> {
        &self.features
    }

    pub fn feature(&self, key: &FeatureKey) -> Option<&Feature> {
        self.features.get(key)
    }

    pub fn aigp(&self) -> &BTreeMap<String, AigpUsage> {
        &self.aigp
    }

    /// Declared labels, without their counts
    pub fn aigp_labels(&self) -> Vec<String> {
        self.aigp.keys().cloned().collect()
    }

    /// Add a feature. A key collision leaves the worksheet untouched.
    ///
    /// The feature's identifying property is rewritten to its key, so the
    /// key it is stored under is the key it is reloaded under.
    pub fn insert_feature(&mut self, mut feature: Feature) -> Result<()> {
        check_key(&feature.key)?;
        feature.align_identity();
        if self.features.contains_key(&feature.key) {
            return Err(AgroError::DuplicateFeatureKey { key: feature.key.to_string() });
        }
        self.features.insert(feature.key.clone(), feature);
        self.recount_aigp();
        Ok(())
    }

    pub fn remove_feature(&mut self, key: &FeatureKey) -> Result<Feature> {
        let removed = self
            .features
            .remove(key)
            .ok_or_else(|| AgroError::FeatureNotFound { key: key.to_string() })?;
        self.recount_aigp();
        Ok(removed)
    }

    /// Move a feature to a new key
    pub fn rekey_feature(&mut self, key: &FeatureKey, new_key: FeatureKey) -> Result<()> {
        if !self.features.contains_key(key) {
            return Err(AgroError::FeatureNotFound { key: key.to_string() });
        }
        check_key(&new_key)?;
        if *key == new_key {
            return Ok(());
        }
        if self.features.contains_key(&new_key) {
            return Err(AgroError::DuplicateFeatureKey { key: new_key.to_string() });
        }
        if let Some(mut feature) = self.features.remove(key) {
            feature.key = new_key.clone();
            feature.align_identity();
            self.features.insert(new_key, feature);
        }
        Ok(())
    }

    /// Declare a label so it can be offered before any feature uses it
    pub fn declare_aigp(&mut self, label: impl Into<String>) {
        let label = label.into();
        let label = label.trim();
        if !label.is_empty() && !self.aigp.contains_key(label) {
            self.aigp.insert(label.to_string(), AigpUsage::Unused);
        }
    }

    /// Set or clear the AIGP label of a feature
    pub fn assign_aigp(&mut self, key: &FeatureKey, label: Option<&str>) -> Result<()> {
        let feature = self
            .features
            .get_mut(key)
            .ok_or_else(|| AgroError::FeatureNotFound { key: key.to_string() })?;
        match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => {
                feature.properties.insert(AIGP_PROPERTY.to_string(), label.into());
            }
            None => {
                feature.properties.remove(AIGP_PROPERTY);
            }
        }
        self.recount_aigp();
        Ok(())
    }

    fn recount_aigp(&mut self) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for feature in self.features.values() {
            if let Some(label) = feature.aigp() {
                *counts.entry(label.to_string()).or_default() += 1;
            }
        }
        for usage in self.aigp.values_mut() {
            *usage = AigpUsage::Unused;
        }
        for (label, n) in counts {
            self.aigp.insert(label, AigpUsage::Used(n));
        }
    }
}

/// Key text of an identifier value; blanks and non-scalars carry no key
pub fn key_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Property value for a key, numeric when the property was and the key allows it
fn key_value(key: &FeatureKey, numeric: bool) -> Value {
    if numeric {
        if let Ok(number) = key.as_str().parse::<i64>() {
            if number.to_string() == key.as_str() {
                return Value::from(number);
            }
        }
    }
    Value::String(key.as_str().to_string())
}

fn check_key(key: &FeatureKey) -> Result<()> {
    if key.as_str().is_empty() {
        return Err(AgroError::MalformedDocument { reason: "feature key is empty".to_string() });
    }
    Ok(())
}
