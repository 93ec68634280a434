//! The opaque secure store seam
//!
//! Everything that persists lives behind [`SecureStore`]: an
//! attribute-indexed record store with an `add`/`update`/`find`/`delete`
//! surface. Records are bags of [`Attributes`] in one of two classes,
//! generic data items and asymmetric keys.
//!
//! [`MemorySecureStore`] is the in-process implementation.

mod attributes;
mod memory;
mod provider;

pub use attributes::{AttrKey, AttrValue, Attributes, TOKEN_ID_SECURE_HARDWARE};
pub use memory::MemorySecureStore;
pub use provider::{
    MatchLimit, Query, RecordClass, SecureStore, StoreError, STATUS_DUPLICATE_ITEM,
    STATUS_ITEM_NOT_FOUND,
};
