use std::fmt::Debug;

use super::attributes::{AttrKey, AttrValue, Attributes};

/// Native status code for "no matching record"
pub const STATUS_ITEM_NOT_FOUND: i32 = -25300;
/// Native status code for "a matching record already exists"
pub const STATUS_DUPLICATE_ITEM: i32 = -25299;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record matched the query
    #[error("item not found")]
    NotFound,
    /// An add collided with an existing record
    #[error("duplicate item")]
    DuplicateItem,
    /// Any other non-success status, carrying the native code
    #[error("secure store failed with status {0}")]
    Status(i32),
}

impl StoreError {
    /// The native status code this error corresponds to
    pub fn code(&self) -> i32 {
        match self {
            StoreError::NotFound => STATUS_ITEM_NOT_FOUND,
            StoreError::DuplicateItem => STATUS_DUPLICATE_ITEM,
            StoreError::Status(code) => *code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            STATUS_ITEM_NOT_FOUND => StoreError::NotFound,
            STATUS_DUPLICATE_ITEM => StoreError::DuplicateItem,
            code => StoreError::Status(code),
        }
    }
}

/// The two record families a secure store keeps apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordClass {
    /// Named, attributed data records (`Account` + `Service`)
    GenericPassword,
    /// Asymmetric keys (`ApplicationLabel` / `ApplicationTag`)
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchLimit {
    #[default]
    One,
    All,
}

/// A record class plus the attributes a record must carry to match
#[derive(Debug, Clone)]
pub struct Query {
    pub class: RecordClass,
    pub attributes: Attributes,
}

impl Query {
    pub fn new(class: RecordClass) -> Self {
        Self {
            class,
            attributes: Attributes::new(),
        }
    }

    pub fn items() -> Self {
        Self::new(RecordClass::GenericPassword)
    }

    pub fn keys() -> Self {
        Self::new(RecordClass::Key)
    }

    pub fn with(mut self, key: AttrKey, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn with_opt<V: Into<AttrValue>>(
        mut self,
        key: AttrKey,
        value: Option<V>,
    ) -> Self {
        if let Some(value) = value {
            self.attributes.insert(key, value);
        }
        self
    }
}

/// The opaque secure key-value store records are persisted in
///
/// Implementations own persistence, access-control enforcement and
/// hardware key isolation. This crate only ever talks to them through
/// these four calls, each of which either succeeds or reports a native
/// status as a `StoreError`.
pub trait SecureStore: Send + Sync + Debug + Clone + 'static {
    /// Persist a new record
    ///
    /// Should fail with `StoreError::DuplicateItem` if a record with the
    /// same identity already exists in `class`.
    fn add(&self, class: RecordClass, attributes: Attributes) -> Result<(), StoreError>;

    /// Overwrite the given attributes on every record matching `query`
    ///
    /// Should fail with `StoreError::NotFound` if nothing matches.
    fn update(&self, query: &Query, attributes: Attributes) -> Result<(), StoreError>;

    /// Return the attributes of matching records
    ///
    /// With `MatchLimit::One` at most one record is returned. Should fail
    /// with `StoreError::NotFound` rather than return an empty list.
    fn find(&self, query: &Query, limit: MatchLimit) -> Result<Vec<Attributes>, StoreError>;

    /// Remove every record matching `query`
    ///
    /// Should fail with `StoreError::NotFound` if nothing matches.
    fn delete(&self, query: &Query) -> Result<(), StoreError>;
}
