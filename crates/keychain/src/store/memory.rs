use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::attributes::{AttrKey, Attributes};
use super::provider::{MatchLimit, Query, RecordClass, SecureStore, StoreError};

/// In-memory secure store
///
/// Records live in insertion order behind a shared lock, so clones of
/// the store see the same records. Useful for tests and for hosts
/// without a platform keychain.
#[derive(Debug, Clone, Default)]
pub struct MemorySecureStore {
    inner: Arc<RwLock<MemorySecureStoreInner>>,
}

#[derive(Debug, Default)]
struct MemorySecureStoreInner {
    records: Vec<Record>,
}

#[derive(Debug, Clone)]
struct Record {
    class: RecordClass,
    attributes: Attributes,
}

impl Record {
    fn matches(&self, query: &Query) -> bool {
        self.class == query.class && self.attributes.matches(&query.attributes)
    }

    /// Whether `other` would occupy the same slot as this record
    ///
    /// Items are identified by group, service and account. Keys by
    /// group and fingerprint, or group and tag when one is set.
    fn collides_with(&self, class: RecordClass, other: &Attributes) -> bool {
        if self.class != class {
            return false;
        }
        let same = |key: AttrKey| self.attributes.get_string(key) == other.get_string(key);
        let same_data = |key: AttrKey| self.attributes.get_data(key) == other.get_data(key);
        match class {
            RecordClass::GenericPassword => {
                same(AttrKey::AccessGroup) && same(AttrKey::Service) && same(AttrKey::Account)
            }
            RecordClass::Key => {
                if !same(AttrKey::AccessGroup) {
                    return false;
                }
                let label_clash = other.contains(AttrKey::ApplicationLabel)
                    && same_data(AttrKey::ApplicationLabel);
                let tag_clash =
                    other.contains(AttrKey::ApplicationTag) && same_data(AttrKey::ApplicationTag);
                label_clash || tag_clash
            }
        }
    }
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records of `class` currently held
    pub fn len(&self, class: RecordClass) -> usize {
        self.inner
            .read()
            .records
            .iter()
            .filter(|record| record.class == class)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }
}

impl SecureStore for MemorySecureStore {
    fn add(&self, class: RecordClass, mut attributes: Attributes) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner
            .records
            .iter()
            .any(|record| record.collides_with(class, &attributes))
        {
            return Err(StoreError::DuplicateItem);
        }

        let now = Utc::now();
        attributes.insert(AttrKey::CreationDate, now);
        attributes.insert(AttrKey::ModificationDate, now);
        inner.records.push(Record { class, attributes });
        Ok(())
    }

    fn update(&self, query: &Query, attributes: Attributes) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let now = Utc::now();
        let mut updated = 0;
        for record in inner.records.iter_mut().filter(|r| r.matches(query)) {
            record.attributes.merge(attributes.clone());
            record.attributes.insert(AttrKey::ModificationDate, now);
            updated += 1;
        }
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn find(&self, query: &Query, limit: MatchLimit) -> Result<Vec<Attributes>, StoreError> {
        let inner = self.inner.read();
        let matches = inner.records.iter().filter(|record| record.matches(query));
        let found: Vec<Attributes> = match limit {
            MatchLimit::One => matches.take(1).map(|r| r.attributes.clone()).collect(),
            MatchLimit::All => matches.map(|r| r.attributes.clone()).collect(),
        };
        if found.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(found)
    }

    fn delete(&self, query: &Query) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let before = inner.records.len();
        inner.records.retain(|record| !record.matches(query));
        if inner.records.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
