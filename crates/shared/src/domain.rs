use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A backend document: a mandatory `id` plus whatever fields the interface
/// defines. Two documents are the same entity when their ids match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Orders two documents by `key`. `"id"` compares identifiers; any other
    /// key compares the JSON field with missing or null values sorting last.
    pub fn cmp_by_key(&self, other: &Self, key: &str) -> Ordering {
        if key == "id" {
            return self.id.cmp(&other.id);
        }
        compare_sort_values(self.field(key), other.field(key))
    }
}

fn compare_sort_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => value_rank(a).cmp(&value_rank(b)),
        },
    }
}

fn value_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 5,
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) => 3,
        Value::Object(_) => 4,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    Analyses,
    Files,
    Groups,
    Hmm,
    Indexes,
    Jobs,
    Otus,
    References,
    Samples,
    Subtractions,
    Users,
}

impl Interface {
    pub const ALL: [Interface; 11] = [
        Interface::Analyses,
        Interface::Files,
        Interface::Groups,
        Interface::Hmm,
        Interface::Indexes,
        Interface::Jobs,
        Interface::Otus,
        Interface::References,
        Interface::Samples,
        Interface::Subtractions,
        Interface::Users,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interface::Analyses => "analyses",
            Interface::Files => "files",
            Interface::Groups => "groups",
            Interface::Hmm => "hmm",
            Interface::Indexes => "indexes",
            Interface::Jobs => "jobs",
            Interface::Otus => "otus",
            Interface::References => "references",
            Interface::Samples => "samples",
            Interface::Subtractions => "subtractions",
            Interface::Users => "users",
        }
    }

    /// Field and direction used to place a newly inserted document.
    /// Returns `(sort_key, reverse)`.
    pub fn sort_order(self) -> (&'static str, bool) {
        match self {
            Interface::Analyses | Interface::Files | Interface::Jobs | Interface::Samples => {
                ("created_at", true)
            }
            Interface::Indexes => ("version", true),
            Interface::Hmm => ("cluster", false),
            Interface::Users | Interface::Groups => ("id", false),
            Interface::Otus | Interface::References | Interface::Subtractions => ("name", false),
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown interface: {0}")]
pub struct UnknownInterface(pub String);

impl FromStr for Interface {
    type Err = UnknownInterface;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interface::ALL
            .into_iter()
            .find(|interface| interface.as_str() == s)
            .ok_or_else(|| UnknownInterface(s.to_string()))
    }
}
