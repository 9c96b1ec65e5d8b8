//! Feature key resolution.

use agrosheet_core::models::{key_text, FeatureKey, KEY_PROPERTIES};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Key a feature already carries, looking at the `key` member, then the
/// `polygon_id` and `id` properties, then the feature `id`
pub fn existing_key(feature: &Value) -> Option<FeatureKey> {
    let properties = feature.get("properties");
    key_text(feature.get("key"))
        .or_else(|| {
            KEY_PROPERTIES
                .iter()
                .find_map(|name| key_text(properties.and_then(|p| p.get(*name))))
        })
        .or_else(|| key_text(feature.get("id")))
        .map(FeatureKey::from)
}

/// Fresh `{unix-millis}-{sequence}` key, unique within the process
pub fn generate_key() -> FeatureKey {
    let millis = chrono::Utc::now().timestamp_millis();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FeatureKey::new(format!("{}-{}", millis, sequence))
}
