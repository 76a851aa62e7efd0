//! stopmap - attribute-value codec and saved-stop store
//!
//! Converts native document values to and from the tagged attribute-value
//! wire format (`S`, `N`, `SS`, `NS`, `BOOL`, `NULL`, `L`, `M`) used by
//! key-value stores, and keeps each user's saved bus stops in such a store.
//!
//! # Example
//!
//! ```rust
//! use stopmap::{decode, encode, field, AttributeValue, Value};
//!
//! let value = Value::map([field("stop", "home"), field("number", 2068i64)]);
//! let wire = encode(&value).unwrap();
//! assert_eq!(
//!     wire.as_m().and_then(|m| m.get("number")),
//!     Some(&AttributeValue::N("2068".into()))
//! );
//! assert_eq!(decode(&wire), value);
//! ```

mod types;
mod codec;
mod wire;
mod json_bridge;
mod canonical;
mod error;
pub mod table;
pub mod stops;

pub use types::*;
pub use codec::*;
pub use wire::*;
pub use json_bridge::*;
pub use canonical::*;
pub use error::*;
pub use table::{
    DocumentTable, Key, KeyAttribute, KeyCondition, KeyKind, KeySchema, MemoryTable,
    RangeCondition, Table, TableConfig,
};
pub use stops::{SavedStop, SavedStops, StopDirectory, StopLookup};
