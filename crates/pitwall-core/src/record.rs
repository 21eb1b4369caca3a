//! Raw records as delivered by the upstream provider.
//!
//! A [`Record`] is a loosely-typed map of field name to [`Scalar`]. Only the
//! [`Normalizer`](crate::normalize::Normalizer) is allowed to assume anything
//! about field shapes; everything downstream works on typed rows.

use std::collections::BTreeMap;

use serde_json::Value;

/// A single loosely-typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
  Null,
  Bool(bool),
  Number(f64),
  Text(String),
}

impl Scalar {
  /// Convert a JSON value. Arrays and objects have no scalar form and yield
  /// `None`.
  pub fn from_json(value: Value) -> Option<Self> {
    match value {
      Value::Null => Some(Self::Null),
      Value::Bool(b) => Some(Self::Bool(b)),
      Value::Number(n) => n.as_f64().map(Self::Number),
      Value::String(s) => Some(Self::Text(s)),
      Value::Array(_) | Value::Object(_) => None,
    }
  }

  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }
}

impl From<f64> for Scalar {
  fn from(n: f64) -> Self { Self::Number(n) }
}

impl From<&str> for Scalar {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

/// One raw record: field name to scalar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
  fields: BTreeMap<String, Scalar>,
}

impl Record {
  pub fn new() -> Self { Self::default() }

  /// Build a record from a JSON object, dropping non-scalar fields.
  /// Returns `None` if `value` is not an object.
  pub fn from_json(value: Value) -> Option<Self> {
    let Value::Object(map) = value else {
      return None;
    };
    let fields = map
      .into_iter()
      .filter_map(|(k, v)| Scalar::from_json(v).map(|s| (k, s)))
      .collect();
    Some(Self { fields })
  }

  pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Scalar>) {
    self.fields.insert(field.into(), value.into());
  }

  /// The value of `field`, treating an explicit `null` the same as absence.
  pub fn get(&self, field: &str) -> Option<&Scalar> {
    self.fields.get(field).filter(|s| !s.is_null())
  }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl<K: Into<String>> FromIterator<(K, Scalar)> for Record {
  fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
    Self {
      fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    }
  }
}
