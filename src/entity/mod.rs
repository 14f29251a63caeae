pub mod models;

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub use models::{LogEntry, LogUser, Room, Service, Staff};

/// Remote endpoints and response envelope keys of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    /// Human readable singular, used in messages
    pub label: &'static str,
    pub list_path: &'static str,
    /// `None` for read-only resources
    pub add_path: Option<&'static str>,
    pub edit_path: Option<&'static str>,
    pub delete_path: Option<&'static str>,
    pub collection_key: &'static str,
    pub item_key: &'static str,
}

impl Resource {
    pub fn is_writable(&self) -> bool {
        self.add_path.is_some() && self.edit_path.is_some() && self.delete_path.is_some()
    }
}

/// A server-managed record the panel can list and edit.
///
/// Field access for searching and sorting goes through the serialized form,
/// so field names are the wire names (`phoneNumber`, `roomNumber`, ...).
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Clone + PartialEq + Display + Send + Sync;

    const RESOURCE: Resource;

    /// Fields offered for sorting
    const SORT_FIELDS: &'static [&'static str];

    fn id(&self) -> &Self::Id;

    fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Value compared when sorting by `field`
    fn sort_value(&self, field: &str) -> Option<Value> {
        self.fields().remove(field)
    }

    /// All field values joined by spaces, the haystack for free-text search
    fn search_text(&self) -> String {
        self.fields()
            .values()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Plain-text rendering of a JSON value as shown in a table cell.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        Value::Object(map) => map.values().map(value_text).collect::<Vec<_>>().join(" "),
    }
}
