use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::crypto::KeyHandle;
use crate::keychain::AccessControl;

/// Names of the attributes a record can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrKey {
    /// Item name
    Account,
    Service,
    AccessGroup,
    /// Free text label; for items this carries the serialized metadata
    Label,
    Description,
    /// Fingerprint of a key's public half
    ApplicationLabel,
    ApplicationTag,
    /// Where a key lives, see `TOKEN_ID_SECURE_HARDWARE`
    TokenId,
    Synchronizable,
    Invisible,
    AccessControl,
    /// Item payload
    ValueData,
    /// Key handle
    ValueRef,
    CreationDate,
    ModificationDate,
}

/// Token id recorded for keys generated inside secure hardware
pub const TOKEN_ID_SECURE_HARDWARE: &str = "secure-hardware";

#[derive(Debug, Clone)]
pub enum AttrValue {
    String(String),
    Data(Vec<u8>),
    Bool(bool),
    Date(DateTime<Utc>),
    Access(AccessControl),
    Key(Arc<dyn KeyHandle>),
}

impl AttrValue {
    /// Whether a stored value satisfies a query value
    ///
    /// Key handles only match themselves.
    pub fn matches(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::String(a), AttrValue::String(b)) => a == b,
            (AttrValue::Data(a), AttrValue::Data(b)) => a == b,
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Date(a), AttrValue::Date(b)) => a == b,
            (AttrValue::Access(a), AttrValue::Access(b)) => a == b,
            (AttrValue::Key(a), AttrValue::Key(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(value: Vec<u8>) -> Self {
        AttrValue::Data(value)
    }
}

impl From<&[u8]> for AttrValue {
    fn from(value: &[u8]) -> Self {
        AttrValue::Data(value.to_vec())
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttrValue::Date(value)
    }
}

impl From<AccessControl> for AttrValue {
    fn from(value: AccessControl) -> Self {
        AttrValue::Access(value)
    }
}

impl From<Arc<dyn KeyHandle>> for AttrValue {
    fn from(value: Arc<dyn KeyHandle>) -> Self {
        AttrValue::Key(value)
    }
}

/// An attribute bag, the unit records are stored, queried and returned in
#[derive(Debug, Clone, Default)]
pub struct Attributes(BTreeMap<AttrKey, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert
    pub fn with(mut self, key: AttrKey, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder style insert that skips `None`
    pub fn with_opt<V: Into<AttrValue>>(mut self, key: AttrKey, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }

    pub fn insert(&mut self, key: AttrKey, value: impl Into<AttrValue>) {
        self.0.insert(key, value.into());
    }

    pub fn remove(&mut self, key: AttrKey) -> Option<AttrValue> {
        self.0.remove(&key)
    }

    pub fn get(&self, key: AttrKey) -> Option<&AttrValue> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: AttrKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn get_string(&self, key: AttrKey) -> Option<&str> {
        match self.get(key) {
            Some(AttrValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_data(&self, key: AttrKey) -> Option<&[u8]> {
        match self.get(key) {
            Some(AttrValue::Data(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: AttrKey) -> Option<bool> {
        match self.get(key) {
            Some(AttrValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_date(&self, key: AttrKey) -> Option<DateTime<Utc>> {
        match self.get(key) {
            Some(AttrValue::Date(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_key(&self, key: AttrKey) -> Option<&Arc<dyn KeyHandle>> {
        match self.get(key) {
            Some(AttrValue::Key(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether every attribute of `query` is present here with a matching value
    pub fn matches(&self, query: &Attributes) -> bool {
        query.0.iter().all(|(key, expected)| {
            self.0
                .get(key)
                .map(|value| value.matches(expected))
                .unwrap_or(false)
        })
    }

    /// Overwrite our attributes with everything set in `other`
    pub fn merge(&mut self, other: Attributes) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttrKey, &AttrValue)> {
        self.0.iter()
    }
}
