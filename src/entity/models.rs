use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Entity, Resource};

/// Accepts `"101"` as well as `101`; room numbers arrive either way.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "phoneNumber", alias = "phone", default)]
    pub phone: String,
    #[serde(default)]
    pub role: String,
}

impl Staff {
    pub const ROLES: [&'static str; 3] = ["Receptionist", "Manager", "Housekeeping"];

    pub fn is_known_role(role: &str) -> bool {
        Self::ROLES.contains(&role)
    }
}

impl Entity for Staff {
    type Id = String;

    const RESOURCE: Resource = Resource {
        label: "staff member",
        list_path: "staff/all",
        add_path: Some("staff/add"),
        edit_path: Some("staff/edit"),
        delete_path: Some("staff/delete"),
        collection_key: "staff",
        item_key: "staff",
    };

    const SORT_FIELDS: &'static [&'static str] = &["name", "email", "role"];

    fn id(&self) -> &String {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "roomNumber", alias = "number", default, deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Room {
    pub const CATEGORIES: [&'static str; 3] = ["Single", "Deluxe", "Suite"];
    pub const STATUSES: [&'static str; 3] = ["Available", "Occupied", "Maintenance"];
}

impl Entity for Room {
    type Id = String;

    const RESOURCE: Resource = Resource {
        label: "room",
        list_path: "rooms/all",
        add_path: Some("rooms/add"),
        edit_path: Some("rooms/edit"),
        delete_path: Some("rooms/delete"),
        collection_key: "rooms",
        item_key: "room",
    };

    const SORT_FIELDS: &'static [&'static str] = &["roomNumber", "category", "price", "status"];

    fn id(&self) -> &String {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub status: String,
}

impl Service {
    pub const STATUSES: [&'static str; 2] = ["Active", "Inactive"];
}

impl Entity for Service {
    type Id = String;

    const RESOURCE: Resource = Resource {
        label: "service",
        list_path: "services/all",
        add_path: Some("services/add"),
        edit_path: Some("services/edit"),
        delete_path: Some("services/delete"),
        collection_key: "services",
        item_key: "service",
    };

    const SORT_FIELDS: &'static [&'static str] = &["name", "price", "status"];

    fn id(&self) -> &String {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Audit trail entry. Read-only from the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<LogUser>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Entity for LogEntry {
    type Id = String;

    const RESOURCE: Resource = Resource {
        label: "log entry",
        list_path: "system-logs",
        add_path: None,
        edit_path: None,
        delete_path: None,
        collection_key: "logs",
        item_key: "log",
    };

    const SORT_FIELDS: &'static [&'static str] = &["user", "action", "timestamp"];

    fn id(&self) -> &String {
        &self.id
    }

    // Sorting by user means sorting by the user's name
    fn sort_value(&self, field: &str) -> Option<Value> {
        match field {
            "user" => self.user.as_ref().map(|u| Value::String(u.name.clone())),
            _ => self.fields().remove(field),
        }
    }
}
