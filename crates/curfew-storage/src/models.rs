//! Rows read back from storage.

use serde::{Deserialize, Serialize};

/// A stored setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    /// Setting key.
    pub key: String,
    /// Setting value (JSON).
    pub value: serde_json::Value,
}
