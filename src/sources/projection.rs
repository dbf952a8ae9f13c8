//! Per-source projection of a response body.
//!
//! Backends return loosely shaped JSON objects. A projection picks the
//! nested field a panel cares about and substitutes a default when the
//! field is missing or `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value substituted when the picked field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    #[default]
    Null,
    EmptyList,
    EmptyObject,
    EmptyString,
}

impl Fallback {
    pub fn value(&self) -> Value {
        match self {
            Fallback::Null => Value::Null,
            Fallback::EmptyList => Value::Array(Vec::new()),
            Fallback::EmptyObject => Value::Object(Map::new()),
            Fallback::EmptyString => Value::String(String::new()),
        }
    }
}

/// Field extraction applied to a successfully parsed body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Dot-separated field path, e.g. `roast.roast`. `None` keeps the whole body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick: Option<String>,

    #[serde(default)]
    pub fallback: Fallback,
}

impl Projection {
    /// Keep the body as-is.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn pick(path: &str, fallback: Fallback) -> Self {
        Self {
            pick: Some(path.to_string()),
            fallback,
        }
    }

    /// Apply the projection, consuming the parsed body.
    pub fn apply(&self, body: Value) -> Value {
        let Some(ref path) = self.pick else {
            return body;
        };

        let mut current = body;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(mut map) => match map.remove(segment) {
                    Some(v) => v,
                    None => return self.fallback.value(),
                },
                _ => return self.fallback.value(),
            };
        }

        if current.is_null() {
            self.fallback.value()
        } else {
            current
        }
    }
}
