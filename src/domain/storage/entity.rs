//! Document and identifier types held by the document store

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key under which every stored document keeps its identifier
pub const ID_KEY: &str = "_id";

/// Collections used by the data access layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-native document identifier
///
/// Parsed from any UUID spelling, always rendered in the canonical
/// lower-case hyphenated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form
    pub fn parse(id: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(id.trim()).map(Self)
    }

    /// Store form of a string identifier; strings that are not identifiers
    /// are kept verbatim
    pub fn value_of(id: &str) -> Value {
        Self::parse(id).map_or_else(|_| Value::String(id.to_owned()), Value::from)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.to_string())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// Schemaless key/value document
///
/// Accessors treat a missing key and an explicit `null` the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert
    pub fn append(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Raw value for a key, `None` when missing or `null`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    /// Identifier stored under `_id`, if present and well formed
    pub fn id(&self) -> Option<DocumentId> {
        self.get_str(ID_KEY)
            .and_then(|raw| DocumentId::parse(raw).ok())
    }

    /// `_id` in canonical string form, verbatim when it is not an identifier
    pub fn id_string(&self) -> Option<String> {
        self.get_str(ID_KEY).map(|raw| {
            DocumentId::parse(raw).map_or_else(|_| raw.to_owned(), |id| id.to_string())
        })
    }

    /// Identifier for a document about to be stored
    ///
    /// A missing `_id` is generated; an existing one must be a well formed
    /// identifier and is rewritten in canonical form.
    pub fn ensure_id(&mut self) -> Result<DocumentId, uuid::Error> {
        let id = match self.get_str(ID_KEY) {
            None => DocumentId::new(),
            Some(raw) => DocumentId::parse(raw)?,
        };
        self.insert(ID_KEY, id);
        Ok(id)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Embedded document from a JSON value, `None` for non-objects
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|map| Self(map.clone()))
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        Value::Object(document.0)
    }
}

impl TryFrom<Value> for Document {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}
