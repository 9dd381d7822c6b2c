//! Query, update and result types understood by every document store

use serde_json::{Map, Value};

use super::entity::{Document, DocumentId, ID_KEY};

/// Document filter
///
/// Paths are dotted (`devices.token`). When a path segment reaches an
/// array, the filter matches if any element matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { path: String, value: Value },
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Match on the document identifier
    pub fn id(id: &DocumentId) -> Self {
        Self::eq(ID_KEY, *id)
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    /// Evaluate the filter against a document
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::Eq { path, value } => {
                let segments: Vec<&str> = path.split('.').collect();
                map_matches(document.as_map(), &segments, value)
            }
            Self::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }
}

fn map_matches(map: &Map<String, Value>, segments: &[&str], expected: &Value) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return false;
    };

    match map.get(*head) {
        Some(child) => value_matches(child, rest, expected),
        None => expected.is_null(),
    }
}

fn value_matches(value: &Value, segments: &[&str], expected: &Value) -> bool {
    if segments.is_empty() {
        return match value {
            Value::Array(items) if !expected.is_array() => items.iter().any(|item| item == expected),
            _ => value == expected,
        };
    }

    match value {
        Value::Object(map) => map_matches(map, segments, expected),
        Value::Array(items) => items
            .iter()
            .any(|item| value_matches(item, segments, expected)),
        _ => false,
    }
}

/// Combined set of top-level field assignments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a top-level field; a later assignment to the same field wins
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        self.set.retain(|(existing, _)| *existing != field);
        self.set.push((field, value.into()));
        self
    }

    /// Merge several updates into one
    pub fn combine(updates: impl IntoIterator<Item = Update>) -> Self {
        updates
            .into_iter()
            .flat_map(|update| update.set)
            .fold(Self::new(), |acc, (field, value)| acc.set(field, value))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.set.iter().map(|(field, value)| (field.as_str(), value))
    }

    /// Apply to a document, returning whether anything changed
    pub fn apply(&self, document: &mut Document) -> bool {
        let mut modified = false;

        for (field, value) in &self.set {
            if document.as_map().get(field) != Some(value) {
                document.insert(field.clone(), value.clone());
                modified = true;
            }
        }

        modified
    }
}

/// Atomic upsert of one element inside an embedded array
///
/// An existing element whose `identity` fields all equal the new element's
/// gets its `refresh` fields overwritten in place; otherwise the new element
/// is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayUpsert {
    field: String,
    identity: Vec<String>,
    refresh: Vec<String>,
    element: Document,
}

impl ArrayUpsert {
    pub fn new(field: impl Into<String>, element: Document) -> Self {
        Self {
            field: field.into(),
            identity: Vec::new(),
            refresh: Vec::new(),
            element,
        }
    }

    pub fn keyed_by<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn refreshing<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refresh = keys.into_iter().map(Into::into).collect();
        self
    }

    fn same_identity(&self, candidate: &Value) -> bool {
        let Some(candidate) = candidate.as_object() else {
            return false;
        };

        self.identity.iter().all(|key| {
            candidate.get(key).unwrap_or(&Value::Null)
                == self.element.as_map().get(key).unwrap_or(&Value::Null)
        })
    }

    /// Apply to a document, returning whether anything changed
    pub fn apply(&self, document: &mut Document) -> bool {
        if !matches!(document.get(&self.field), Some(Value::Array(_))) {
            document.insert(self.field.clone(), Value::Array(Vec::new()));
        }

        let Some(Value::Array(items)) = document.get_mut(&self.field) else {
            return false;
        };

        let Some(index) = items.iter().position(|item| self.same_identity(item)) else {
            items.push(self.element.clone().into());
            return true;
        };

        let Some(existing) = items[index].as_object_mut() else {
            return false;
        };

        let mut modified = false;
        for key in &self.refresh {
            let incoming = self
                .element
                .as_map()
                .get(key)
                .cloned()
                .unwrap_or(Value::Null);
            if existing.get(key) != Some(&incoming) {
                existing.insert(key.clone(), incoming);
                modified = true;
            }
        }
        modified
    }
}

/// Outcome of an insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOneResult {
    pub inserted_id: Option<DocumentId>,
}

/// Outcome of an insert guarded by a conflict filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalInsert {
    Inserted(InsertOneResult),
    /// A stored document already matches the conflict filter
    Conflict,
}

/// Outcome of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Outcome of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_with_devices() -> Document {
        Document::try_from(json!({
            "_id": "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "email": "bot@valhalla.org",
            "devices": [
                {"address": "127.0.0.1", "useragent": "Firefox, Linux", "token": "t-1"},
                {"address": "10.0.0.2", "useragent": "Safari, macOS", "token": "t-2"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_filter_top_level_eq() {
        let doc = user_with_devices();
        assert!(Filter::eq("email", "bot@valhalla.org").matches(&doc));
        assert!(!Filter::eq("email", "other@valhalla.org").matches(&doc));
    }

    #[test]
    fn test_filter_traverses_arrays() {
        let doc = user_with_devices();
        assert!(Filter::eq("devices.token", "t-2").matches(&doc));
        assert!(!Filter::eq("devices.token", "t-3").matches(&doc));
    }

    #[test]
    fn test_filter_and() {
        let doc = user_with_devices();
        let id = DocumentId::parse("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();

        assert!(Filter::and(vec![Filter::id(&id), Filter::eq("devices.token", "t-1")]).matches(&doc));
        assert!(!Filter::and(vec![Filter::id(&DocumentId::new()), Filter::eq("devices.token", "t-1")])
            .matches(&doc));
    }

    #[test]
    fn test_filter_null_matches_missing() {
        let doc = user_with_devices();
        assert!(Filter::eq("validationcode", Value::Null).matches(&doc));
    }

    #[test]
    fn test_update_combine_and_apply() {
        let mut doc = user_with_devices();
        let update = Update::combine(vec![
            Update::new().set("username", "first"),
            Update::new().set("username", "second").set("validated", true),
        ]);

        assert_eq!(update.fields().count(), 2);
        assert!(update.apply(&mut doc));
        assert_eq!(doc.get_str("username"), Some("second"));
        assert!(!update.apply(&mut doc));
    }

    #[test]
    fn test_array_upsert_refreshes_matching_element() {
        let mut doc = user_with_devices();
        let element = Document::new()
            .append("address", "127.0.0.1")
            .append("useragent", "Firefox, Linux")
            .append("token", "t-new");
        let upsert = ArrayUpsert::new("devices", element)
            .keyed_by(["address", "useragent"])
            .refreshing(["token"]);

        assert!(upsert.apply(&mut doc));

        let devices = doc.get_array("devices").unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0]["token"], "t-new");
        assert!(!upsert.apply(&mut doc));
    }

    #[test]
    fn test_array_upsert_appends_new_identity() {
        let mut doc = user_with_devices();
        let element = Document::new()
            .append("address", "127.0.0.1")
            .append("useragent", "Chrome, Android")
            .append("token", "t-3");
        let upsert = ArrayUpsert::new("devices", element)
            .keyed_by(["address", "useragent"])
            .refreshing(["token"]);

        assert!(upsert.apply(&mut doc));
        assert_eq!(doc.get_array("devices").unwrap().len(), 3);
    }

    #[test]
    fn test_array_upsert_creates_missing_array() {
        let mut doc = Document::new().append("devices", Value::Null);
        let upsert = ArrayUpsert::new("devices", Document::new().append("token", "t"))
            .keyed_by(["address", "useragent"]);

        assert!(upsert.apply(&mut doc));
        assert_eq!(doc.get_array("devices").unwrap().len(), 1);
    }
}
