//! Key-value table abstraction over wire items
//!
//! [`Table`] is the store boundary: it accepts and returns wire [`Item`]s
//! and never sees native values. [`DocumentTable`] layers the codec on top
//! so callers can read and write native [`Value`]s.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`get`](Table::get) | Fetch one item by full key |
//! | [`put`](Table::put) | Insert or replace an item |
//! | [`delete`](Table::delete) | Remove an item, returning it |
//! | [`query`](Table::query) | Items sharing a hash key, filtered and ordered by range key |

use crate::canonical::canonicalize;
use crate::codec::{decode_item, encode_item, parse_number};
use crate::error::*;
use crate::types::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Default table holding saved stops
pub const DEFAULT_TABLE_NAME: &str = "dublinBusData";

/// Default hash key attribute
pub const DEFAULT_HASH_KEY: &str = "userId";

/// Scalar type of a key attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Wire tag `S`
    String,
    /// Wire tag `N`
    Number,
}

impl KeyKind {
    pub fn tag(&self) -> &'static str {
        match self {
            KeyKind::String => "S",
            KeyKind::Number => "N",
        }
    }

    fn accepts(&self, v: &AttributeValue) -> bool {
        matches!(
            (self, v),
            (KeyKind::String, AttributeValue::S(_)) | (KeyKind::Number, AttributeValue::N(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub name: String,
    pub kind: KeyKind,
}

impl KeyAttribute {
    pub fn new(name: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    fn check(&self, v: &AttributeValue) -> Result<()> {
        if self.kind.accepts(v) {
            Ok(())
        } else {
            Err(CodecError::InvalidKey(format!(
                "{} must be {}, got {}",
                self.name,
                self.kind.tag(),
                v.tag()
            )))
        }
    }
}

/// Hash key plus optional range key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub hash: KeyAttribute,
    #[serde(default)]
    pub range: Option<KeyAttribute>,
}

impl KeySchema {
    pub fn hash_only(name: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            hash: KeyAttribute::new(name, kind),
            range: None,
        }
    }

    pub fn with_range(mut self, name: impl Into<String>, kind: KeyKind) -> Self {
        self.range = Some(KeyAttribute::new(name, kind));
        self
    }

    /// Check a key against the schema
    pub fn validate_key(&self, key: &Key) -> Result<()> {
        self.hash.check(&key.hash)?;
        match (&self.range, &key.range) {
            (Some(attr), Some(v)) => attr.check(v),
            (Some(attr), None) => Err(CodecError::MissingField(attr.name.clone())),
            (None, Some(_)) => Err(CodecError::InvalidKey(
                "range value given for a hash-only table".to_string(),
            )),
            (None, None) => Ok(()),
        }
    }

    /// Extract and validate the key attributes of an item
    pub fn key_of(&self, item: &Item) -> Result<Key> {
        let key = Key {
            hash: key_attribute(item, &self.hash)?,
            range: self
                .range
                .as_ref()
                .map(|attr| key_attribute(item, attr))
                .transpose()?,
        };
        self.validate_key(&key)?;
        Ok(key)
    }
}

fn key_attribute(item: &Item, attr: &KeyAttribute) -> Result<AttributeValue> {
    item.get(&attr.name)
        .cloned()
        .ok_or_else(|| CodecError::MissingField(attr.name.clone()))
}

impl Default for KeySchema {
    fn default() -> Self {
        Self::hash_only(DEFAULT_HASH_KEY, KeyKind::String)
    }
}

/// Table settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default)]
    pub key_schema: KeySchema,
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            key_schema: KeySchema::default(),
        }
    }
}

impl TableConfig {
    /// Load settings from JSON; absent fields take their defaults
    pub fn from_json_str(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }
}

/// Full primary key of an item
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub hash: AttributeValue,
    pub range: Option<AttributeValue>,
}

impl Key {
    pub fn hash(hash: impl Into<AttributeValue>) -> Self {
        Self { hash: hash.into(), range: None }
    }

    pub fn new(hash: impl Into<AttributeValue>, range: impl Into<AttributeValue>) -> Self {
        Self {
            hash: hash.into(),
            range: Some(range.into()),
        }
    }

    fn index(&self) -> String {
        let mut idx = canonicalize(&self.hash);
        if let Some(range) = &self.range {
            idx.push('\u{0}');
            idx.push_str(&canonicalize(range));
        }
        idx
    }
}

impl From<&str> for Key {
    fn from(hash: &str) -> Self {
        Key::hash(hash)
    }
}

/// Condition on the range key of a query
#[derive(Debug, Clone, PartialEq)]
pub enum RangeCondition {
    Eq(AttributeValue),
    Lt(AttributeValue),
    Le(AttributeValue),
    Gt(AttributeValue),
    Ge(AttributeValue),
    /// Inclusive on both ends
    Between(AttributeValue, AttributeValue),
    /// String range keys only
    BeginsWith(String),
}

impl RangeCondition {
    fn operands(&self) -> Vec<&AttributeValue> {
        match self {
            RangeCondition::Eq(v)
            | RangeCondition::Lt(v)
            | RangeCondition::Le(v)
            | RangeCondition::Gt(v)
            | RangeCondition::Ge(v) => vec![v],
            RangeCondition::Between(lo, hi) => vec![lo, hi],
            RangeCondition::BeginsWith(_) => vec![],
        }
    }

    pub fn matches(&self, v: &AttributeValue) -> bool {
        use Ordering::*;
        match self {
            RangeCondition::Eq(x) => compare_keys(v, x) == Some(Equal),
            RangeCondition::Lt(x) => compare_keys(v, x) == Some(Less),
            RangeCondition::Le(x) => matches!(compare_keys(v, x), Some(Less | Equal)),
            RangeCondition::Gt(x) => compare_keys(v, x) == Some(Greater),
            RangeCondition::Ge(x) => matches!(compare_keys(v, x), Some(Greater | Equal)),
            RangeCondition::Between(lo, hi) => {
                matches!(compare_keys(v, lo), Some(Greater | Equal))
                    && matches!(compare_keys(v, hi), Some(Less | Equal))
            }
            RangeCondition::BeginsWith(prefix) => {
                v.as_s().is_some_and(|s| s.starts_with(prefix.as_str()))
            }
        }
    }
}

/// Key condition for [`Table::query`]
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub hash: AttributeValue,
    pub range: Option<RangeCondition>,
}

impl KeyCondition {
    pub fn hash(hash: impl Into<AttributeValue>) -> Self {
        Self { hash: hash.into(), range: None }
    }

    pub fn with_range(mut self, condition: RangeCondition) -> Self {
        self.range = Some(condition);
        self
    }
}

/// Order of two key values of the same kind; `None` across kinds
pub fn compare_keys(a: &AttributeValue, b: &AttributeValue) -> Option<Ordering> {
    match (a, b) {
        (AttributeValue::S(x), AttributeValue::S(y)) => Some(x.cmp(y)),
        (AttributeValue::N(x), AttributeValue::N(y)) => parse_number(x).partial_cmp(&parse_number(y)),
        _ => None,
    }
}

/// Storage backend for wire items
pub trait Table: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> &KeySchema;

    /// Fetch the item stored under `key`
    fn get(&self, key: &Key) -> Result<Option<Item>>;

    /// Insert `item`, replacing any item with the same key
    fn put(&self, item: Item) -> Result<()>;

    /// Remove the item under `key`, returning it if it existed
    fn delete(&self, key: &Key) -> Result<Option<Item>>;

    /// Items whose hash key equals the condition's, ordered by range key
    fn query(&self, condition: &KeyCondition) -> Result<Vec<Item>>;
}

impl<T: Table + ?Sized> Table for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn schema(&self) -> &KeySchema {
        (**self).schema()
    }

    fn get(&self, key: &Key) -> Result<Option<Item>> {
        (**self).get(key)
    }

    fn put(&self, item: Item) -> Result<()> {
        (**self).put(item)
    }

    fn delete(&self, key: &Key) -> Result<Option<Item>> {
        (**self).delete(key)
    }

    fn query(&self, condition: &KeyCondition) -> Result<Vec<Item>> {
        (**self).query(condition)
    }
}

/// In-memory table for tests and local runs
pub struct MemoryTable {
    name: String,
    schema: KeySchema,
    items: RwLock<BTreeMap<String, Item>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, schema: KeySchema) -> Self {
        Self {
            name: name.into(),
            schema,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_config(config: &TableConfig) -> Self {
        Self::new(config.table_name.clone(), config.key_schema.clone())
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn validate_condition(&self, condition: &KeyCondition) -> Result<()> {
        self.schema.hash.check(&condition.hash)?;
        let Some(cond) = &condition.range else {
            return Ok(());
        };
        let Some(attr) = &self.schema.range else {
            return Err(CodecError::InvalidKey(
                "range condition on a hash-only table".to_string(),
            ));
        };
        if matches!(cond, RangeCondition::BeginsWith(_)) && attr.kind != KeyKind::String {
            return Err(CodecError::InvalidKey(format!(
                "begins_with needs a string range key, {} is {}",
                attr.name,
                attr.kind.tag()
            )));
        }
        cond.operands().into_iter().try_for_each(|v| attr.check(v))
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::from_config(&TableConfig::default())
    }
}

impl Table for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &KeySchema {
        &self.schema
    }

    fn get(&self, key: &Key) -> Result<Option<Item>> {
        self.schema.validate_key(key)?;
        let found = self.items.read().get(&key.index()).cloned();
        debug!(table = %self.name, hit = found.is_some(), "get item");
        Ok(found)
    }

    fn put(&self, item: Item) -> Result<()> {
        let key = self.schema.key_of(&item)?;
        let replaced = self.items.write().insert(key.index(), item).is_some();
        debug!(table = %self.name, replaced, "put item");
        Ok(())
    }

    fn delete(&self, key: &Key) -> Result<Option<Item>> {
        self.schema.validate_key(key)?;
        let removed = self.items.write().remove(&key.index());
        debug!(table = %self.name, existed = removed.is_some(), "delete item");
        Ok(removed)
    }

    fn query(&self, condition: &KeyCondition) -> Result<Vec<Item>> {
        self.validate_condition(condition)?;
        let hash = canonicalize(&condition.hash);
        let hash_name = &self.schema.hash.name;
        let range_name = self.schema.range.as_ref().map(|attr| attr.name.as_str());

        let mut matched: Vec<Item> = self
            .items
            .read()
            .values()
            .filter(|item| item.get(hash_name).is_some_and(|v| canonicalize(v) == hash))
            .filter(|item| match (&condition.range, range_name) {
                (Some(cond), Some(name)) => item.get(name).is_some_and(|v| cond.matches(v)),
                _ => true,
            })
            .cloned()
            .collect();

        if let Some(name) = range_name {
            matched.sort_by(|a, b| match (a.get(name), b.get(name)) {
                (Some(x), Some(y)) => compare_keys(x, y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        }

        debug!(table = %self.name, count = matched.len(), "query items");
        Ok(matched)
    }
}

/// Native-value access to any [`Table`] through the codec
pub trait DocumentTable: Table {
    /// Fetch and decode the item under `key`
    fn find(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.get(key)?.as_ref().map(decode_item))
    }

    /// Encode a map value and store it
    fn insert(&self, doc: &Value) -> Result<()> {
        self.put(encode_item(doc)?)
    }

    /// Remove the item under `key`, returning it decoded
    fn remove(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.delete(key)?.as_ref().map(decode_item))
    }

    /// Every item sharing a hash key, decoded
    fn find_all(&self, hash: impl Into<AttributeValue>) -> Result<Vec<Value>> {
        let items = self.query(&KeyCondition::hash(hash))?;
        Ok(items.iter().map(decode_item).collect())
    }
}

impl<T: Table + ?Sized> DocumentTable for T {}
