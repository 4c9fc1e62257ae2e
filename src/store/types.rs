//! Typed records, queries and writes exchanged with a document source.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collections the gateway knows about.
///
/// The string form is an explicit table (see [`CollectionKind::as_str`]) so
/// renaming a variant never silently changes what is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum CollectionKind {
    Users,
    Jobs,
    Locals,
    Crews,
    Posts,
    Notifications,
}

/// Raised when a collection name is not in the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown collection '{0}'")]
pub struct UnknownCollection(pub String);

impl CollectionKind {
    pub const ALL: [CollectionKind; 6] = [
        CollectionKind::Users,
        CollectionKind::Jobs,
        CollectionKind::Locals,
        CollectionKind::Crews,
        CollectionKind::Posts,
        CollectionKind::Notifications,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Users => "users",
            CollectionKind::Jobs => "jobs",
            CollectionKind::Locals => "locals",
            CollectionKind::Crews => "crews",
            CollectionKind::Posts => "posts",
            CollectionKind::Notifications => "notifications",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnknownCollection> {
        match s.trim().to_ascii_lowercase().as_str() {
            "users" => Ok(CollectionKind::Users),
            "jobs" => Ok(CollectionKind::Jobs),
            "locals" => Ok(CollectionKind::Locals),
            "crews" => Ok(CollectionKind::Crews),
            "posts" => Ok(CollectionKind::Posts),
            "notifications" => Ok(CollectionKind::Notifications),
            _ => Err(UnknownCollection(s.to_string())),
        }
    }

    /// Current record schema version for this collection.
    pub fn schema_version(self) -> u32 {
        match self {
            CollectionKind::Users => 2,
            CollectionKind::Jobs => 1,
            CollectionKind::Locals => 1,
            CollectionKind::Crews => 1,
            CollectionKind::Posts => 1,
            CollectionKind::Notifications => 1,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CollectionKind {
    type Error = UnknownCollection;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CollectionKind::parse(&value)
    }
}

impl From<CollectionKind> for &'static str {
    fn from(kind: CollectionKind) -> Self {
        kind.as_str()
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Case-insensitive for text, structural for everything else.
    fn loosely_equals(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.eq_ignore_ascii_case(b),
            _ => self == other,
        }
    }

    fn order_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) | FieldValue::Float(_) => 2,
            FieldValue::Text(_) => 3,
            FieldValue::List(_) => 4,
            FieldValue::Map(_) => 5,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Total order used when sorting query results.
    pub fn order_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => self.order_rank().cmp(&other.order_rank()),
            },
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

fn default_schema_version() -> u32 {
    1
}

/// A document as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub collection: CollectionKind,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record at the collection's current schema version.
    pub fn new(collection: CollectionKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection,
            schema_version: collection.schema_version(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn doc_ref(&self) -> DocRef {
        DocRef::new(self.collection, self.id.clone())
    }
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocRef {
    pub collection: CollectionKind,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: CollectionKind, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

/// Query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: FieldValue },
    In { field: String, values: Vec<FieldValue> },
    /// Text field starts with `prefix` (case-insensitive).
    Prefix { field: String, prefix: String },
    /// Array field contains `value`.
    ArrayContains { field: String, value: FieldValue },
    /// Array field contains at least one of `values`.
    ArrayContainsAny { field: String, values: Vec<FieldValue> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Filter::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. }
            | Filter::In { field, .. }
            | Filter::Prefix { field, .. }
            | Filter::ArrayContains { field, .. }
            | Filter::ArrayContainsAny { field, .. } => field,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(self.field()) else {
            return false;
        };
        match self {
            Filter::Eq { value, .. } => actual == value,
            Filter::In { values, .. } => values.iter().any(|v| v == actual),
            Filter::Prefix { prefix, .. } => actual
                .as_text()
                .map(|text| text.to_lowercase().starts_with(&prefix.to_lowercase()))
                .unwrap_or(false),
            Filter::ArrayContains { value, .. } => actual
                .as_list()
                .map(|items| items.iter().any(|item| item.loosely_equals(value)))
                .unwrap_or(false),
            Filter::ArrayContainsAny { values, .. } => actual
                .as_list()
                .map(|items| {
                    items
                        .iter()
                        .any(|item| values.iter().any(|v| item.loosely_equals(v)))
                })
                .unwrap_or(false),
        }
    }
}

/// Sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// Pagination cursor: results resume after the record with this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub after_id: String,
}

impl Cursor {
    pub fn after(id: impl Into<String>) -> Self {
        Self { after_id: id.into() }
    }
}

/// A filtered, ordered, optionally paginated read over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionKind,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub start_after: Option<Cursor>,
}

impl Query {
    pub fn new(collection: CollectionKind) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
            start_after: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, cursor: Option<Cursor>) -> Self {
        self.start_after = cursor;
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.collection == self.collection && self.filters.iter().all(|f| f.matches(record))
    }

    /// Ordering applied to matching records before pagination.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        if let Some(order) = &self.order_by {
            let ord = match (a.get(&order.field), b.get(&order.field)) {
                (Some(x), Some(y)) => x.order_cmp(y),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ord = if order.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.id.cmp(&b.id)
    }
}

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set(Record),
    Update {
        doc: DocRef,
        fields: BTreeMap<String, FieldValue>,
    },
    Delete(DocRef),
}

/// Writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, record: Record) -> Self {
        self.ops.push(WriteOp::Set(record));
        self
    }

    pub fn update(mut self, doc: DocRef, fields: BTreeMap<String, FieldValue>) -> Self {
        self.ops.push(WriteOp::Update { doc, fields });
        self
    }

    pub fn delete(mut self, doc: DocRef) -> Self {
        self.ops.push(WriteOp::Delete(doc));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
