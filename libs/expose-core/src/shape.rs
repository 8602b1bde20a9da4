//! Result shaping: strip synthetic identifier fields from nested raw data
//! and wrap the payload under a single deterministic key.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::resolve::SyntheticFields;

/// Whether a route returns one record or a sequence of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Item,
    Collection,
}

/// Route-configured names used to wrap a response when the payload does not
/// name itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAliases {
    pub element: String,
    pub collection: String,
}

impl EntityAliases {
    pub fn new(element: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            collection: collection.into(),
        }
    }
}

/// A shaped result: payload plus the single top-level key it serializes
/// under, e.g. `{"books": [...]}`.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    key: String,
    data: Value,
}

impl Envelope {
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_value(self) -> Value {
        let mut map = serde_json::Map::with_capacity(1);
        map.insert(self.key, self.data);
        Value::Object(map)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.data)?;
        map.end()
    }
}

/// Strip the fields recorded in `synthetic` out of `data` and wrap the
/// result.
///
/// Collections are stripped element by element: a malformed or partial
/// element never affects its siblings. Key naming, in order of precedence:
/// an explicit `key_override`; the payload's own key when it is a
/// single-entry object (unwrapped one level); otherwise the configured
/// collection or element alias.
pub fn shape(
    mut data: Value,
    synthetic: &SyntheticFields,
    kind: ResourceKind,
    aliases: &EntityAliases,
    key_override: Option<&str>,
) -> Envelope {
    match (kind, &mut data) {
        (ResourceKind::Collection, Value::Array(items)) => {
            for item in items {
                strip(item, synthetic);
            }
        }
        _ => strip(&mut data, synthetic),
    }

    if let Some(key) = key_override {
        return Envelope::new(key, data);
    }

    // A single-entry object names itself: adopt the key, unwrap one level.
    if let Value::Object(map) = &mut data {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter_mut().next().map(|(k, v)| (k.clone(), v.take())) {
                return Envelope::new(key, inner);
            }
        }
    }

    let key = match kind {
        ResourceKind::Collection => aliases.collection.clone(),
        ResourceKind::Item => aliases.element.clone(),
    };
    Envelope::new(key, data)
}

/// Remove synthetic scalar fields at this level, then recurse into
/// associations that recorded synthetic children. Fields the client asked
/// for are never touched: the synthetic map only ever holds the injected
/// difference.
fn strip(node: &mut Value, synthetic: &SyntheticFields) {
    if synthetic.is_empty() {
        return;
    }
    let Value::Object(map) = node else {
        return;
    };
    map.retain(|key, _| !synthetic.contains(key));
    for (key, value) in map.iter_mut() {
        if let Some(child) = synthetic.child(key) {
            match value {
                Value::Array(items) => {
                    for item in items {
                        strip(item, child);
                    }
                }
                Value::Object(_) => strip(value, child),
                _ => {}
            }
        }
    }
}
