//! A container for diagnostics reported by learning passes.
//!
//! Agents return a [`Record`] from their learning operations (sweep deltas,
//! loss values) so an external driver can display learning progress without
//! reaching into the agent's internals.
use crate::error::RlabError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};

/// Possible types of values stored in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating-point value, typically a metric such as a loss.
    Scalar(f32),

    /// A timestamp with local timezone.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array of floating-point values.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// Key-value pairs of diagnostics produced during learning.
#[derive(Debug, Clone)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Constructs an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Constructs a record holding a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        let mut record = Self::empty();
        record.insert(name, RecordValue::Scalar(value));
        record
    }

    /// Constructs a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns the keys of the record.
    pub fn keys(&self) -> Keys<'_, String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a value under the given key, replacing any previous value.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Iterates over the entries of the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns the value stored under the given key, if any.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges the entries of another record into this one.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Whether the record holds no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the scalar value stored under the given key.
    pub fn get_scalar(&self, k: &str) -> Result<f32, RlabError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(RlabError::RecordValueTypeError("Scalar".to_string())),
            None => Err(RlabError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the 1-dimensional array stored under the given key.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, RlabError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(RlabError::RecordValueTypeError("Array1".to_string())),
            None => Err(RlabError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the string stored under the given key.
    pub fn get_string(&self, k: &str) -> Result<String, RlabError> {
        match self.0.get(k) {
            Some(RecordValue::String(v)) => Ok(v.clone()),
            Some(_) => Err(RlabError::RecordValueTypeError("String".to_string())),
            None => Err(RlabError::RecordKeyError(k.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trip() {
        let mut record = Record::from_scalar("loss", 0.5);
        record.insert("delta", RecordValue::Scalar(1e-3));
        assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
        assert_eq!(record.get_scalar("delta").unwrap(), 1e-3);
        assert!(record.get_scalar("missing").is_err());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let record = Record::from_slice(&[("probs", RecordValue::Array1(vec![0.25; 4]))]);
        assert!(record.get_scalar("probs").is_err());
        assert_eq!(record.get_array1("probs").unwrap().len(), 4);
    }
}
