use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Session-scoped variable store: an insertion-ordered map of JSON values
/// with total (non-panicking) dot-path accessors.
///
/// Paths are `.`-separated; numeric segments index into arrays. A set on a
/// deep path creates intermediate objects, replacing any non-object value
/// it walks through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableBag(Map<String, Value>);

impl VariableBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut parts = path.split('.');
        let first = match parts.next() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return,
        };
        let rest: Vec<&str> = parts.collect();
        if rest.is_empty() {
            self.0.insert(first, value);
            return;
        }
        let mut current = self
            .0
            .entry(first)
            .or_insert_with(|| Value::Object(Map::new()));
        let (last, intermediate) = match rest.split_last() {
            Some(split) => split,
            None => return,
        };
        for part in intermediate {
            current = ensure_object(current)
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(current).insert(last.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for VariableBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for VariableBag {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
