use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::value_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Column sort selection. Both parts are `None` until a field is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: Option<String>,
    pub direction: Option<SortDirection>,
}

impl SortState {
    /// Select `field`. Reselecting the field sorted ascending flips it to
    /// descending; anything else starts ascending. An empty field clears.
    pub fn toggle(&mut self, field: &str) {
        if field.is_empty() {
            *self = SortState::default();
            return;
        }
        let direction = match (&self.field, self.direction) {
            (Some(current), Some(SortDirection::Asc)) if current == field => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        self.field = Some(field.to_string());
        self.direction = Some(direction);
    }

    pub fn active(&self) -> Option<(&str, SortDirection)> {
        match (&self.field, self.direction) {
            (Some(field), Some(direction)) => Some((field.as_str(), direction)),
            _ => None,
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Default ordering of two field values: numeric when both sides are
/// numbers (or numeric strings), otherwise by their text. A number sorts
/// before any non-numeric value, which keeps the order total when a column
/// mixes both.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(as_number), b.and_then(as_number)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            let text = |v: Option<&Value>| v.map(value_text).unwrap_or_default();
            text(a).cmp(&text(b))
        }
    }
}
