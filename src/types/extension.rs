//! Extension data: wire fields that have no declared property yet.
//!
//! Every DTO carries an [`ExtensionData`] map flattened into its own JSON object,
//! so unknown response fields survive a decode/encode cycle and callers can send
//! provider parameters the crate has not modeled. Keys live at the same level as
//! declared fields, never under a wrapper key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw JSON side-map attached to a DTO.
///
/// A key that is not present is "absent"; a present key holds a
/// [`serde_json::Value`] (null, scalar, array or object) preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionData(Map<String, Value>);

impl ExtensionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ExtensionData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ExtensionData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Declared wire field names of a DTO plus access to its extension map.
///
/// The encoder uses `FIELDS` to reject extension keys that would shadow a
/// declared field in the serialized object.
pub trait WireFields {
    const FIELDS: &'static [&'static str];

    fn extension_data(&self) -> &ExtensionData;

    fn extension_data_mut(&mut self) -> &mut ExtensionData;

    /// Extension keys colliding with declared fields, as field paths.
    /// Composite DTOs override this to include their nested values.
    fn colliding_extension_keys(&self) -> Vec<String> {
        colliding_keys(Self::FIELDS, self.extension_data(), "")
    }
}

pub(crate) fn colliding_keys(fields: &[&str], ext: &ExtensionData, prefix: &str) -> Vec<String> {
    ext.keys()
        .filter(|k| fields.contains(&k.as_str()))
        .map(|k| format!("{}{}", prefix, k))
        .collect()
}

/// Implements [`WireFields`] for a DTO whose extension field is named `extension`.
macro_rules! wire_fields {
    ($ty:ty, [$($field:literal),* $(,)?]) => {
        impl $crate::types::extension::WireFields for $ty {
            const FIELDS: &'static [&'static str] = &[$($field),*];

            fn extension_data(&self) -> &$crate::types::extension::ExtensionData {
                &self.extension
            }

            fn extension_data_mut(&mut self) -> &mut $crate::types::extension::ExtensionData {
                &mut self.extension
            }
        }
    };
}

pub(crate) use wire_fields;
