//! Self-describing item metadata
//!
//! Every item written by this crate carries a small JSON object in its
//! label attribute, next to (not inside) the payload:
//!
//! ```text
//! {"type":"Codable","encryption":"BGsX0fLhLEJH+Lzm5WOkQPJ3A32BLeszoPShOUXYmMKW..."}
//! ```
//!
//! `encryption` holds the uncompressed public key the payload was
//! encrypted to, base64 encoded, and is absent for plaintext payloads.
//! Records whose label is missing or not metadata are read as plain
//! password items.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// What an item's payload holds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemType {
    String,
    Data,
    /// A JSON encoded value
    Structured,
    Password,
    /// A type written by a newer version; read back as raw data
    Unknown(String),
}

impl ItemType {
    pub fn as_str(&self) -> &str {
        match self {
            ItemType::String => "String",
            ItemType::Data => "Data",
            ItemType::Structured => "Codable",
            ItemType::Password => "Password",
            ItemType::Unknown(name) => name,
        }
    }

    /// Whether items of this type are encrypted when encryption is enabled
    pub fn is_encryptable(&self) -> bool {
        matches!(self, ItemType::String | ItemType::Data | ItemType::Structured)
    }
}

impl From<String> for ItemType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "String" => ItemType::String,
            "Data" => ItemType::Data,
            "Codable" => ItemType::Structured,
            "Password" => ItemType::Password,
            _ => ItemType::Unknown(value),
        }
    }
}

impl From<ItemType> for String {
    fn from(value: ItemType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Uncompressed public key the payload is encrypted to
    #[serde_as(as = "Option<Base64>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Vec<u8>>,
}

impl ItemMetadata {
    pub fn new(item_type: ItemType, encryption: Option<Vec<u8>>) -> Self {
        Self {
            item_type,
            encryption,
        }
    }

    /// Metadata assumed for records that carry none
    pub fn legacy() -> Self {
        Self::new(ItemType::Password, None)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Best-effort parse of a label
    pub fn decode(label: &str) -> Option<Self> {
        serde_json::from_str(label).ok()
    }

    /// Metadata of a record given its label, defaulting to [`ItemMetadata::legacy`]
    pub fn from_label(label: Option<&str>) -> Self {
        match label.and_then(Self::decode) {
            Some(metadata) => metadata,
            None => {
                tracing::debug!(
                    "no item metadata in label {:?}, reading as password",
                    label
                );
                Self::legacy()
            }
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }
}
