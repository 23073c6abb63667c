//! Confirmed-tier admission: schema validation plus a content fingerprint.

use sha2::{Digest, Sha256};

use crate::dataset::Dataset;
use crate::error::Result;

/// A dataset that passed validation.
///
/// Only [`certify`] can build one. The store re-hashes the dataset on
/// write and refuses it when the fingerprint no longer matches.
#[derive(Debug, Clone)]
pub struct Certified {
    dataset: Dataset,
    fingerprint: String,
}

impl Certified {
    /// The certified dataset.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Fingerprint taken at certification time.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Give back the dataset, dropping the certificate.
    pub fn into_inner(self) -> Dataset {
        self.dataset
    }
}

/// Validate a dataset against its own schema and certify it.
pub fn certify(dataset: Dataset) -> Result<Certified> {
    dataset.validate()?;
    let fingerprint = fingerprint(&dataset)?;
    Ok(Certified {
        dataset,
        fingerprint,
    })
}

/// SHA-256 over the name, schema and rows of a dataset.
pub fn fingerprint(dataset: &Dataset) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(dataset.name.as_bytes());
    hasher.update(serde_json::to_vec(&dataset.schema)?);
    hasher.update(serde_json::to_vec(&dataset.rows)?);
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::error::ErrorKind;
    use crate::schema::{Column, Schema, ValueType};

    fn dataset(gold: Value) -> Dataset {
        Dataset {
            name: "medals".to_string(),
            schema: Schema::with_columns(vec![Column::required("gold", ValueType::Integer)]),
            rows: vec![vec![gold]],
            provenance: None,
        }
    }

    #[test]
    fn test_certify_valid_dataset() {
        let certified = certify(dataset(Value::Integer(39))).unwrap();
        assert!(certified.fingerprint().starts_with("sha256:"));
        assert_eq!(certified.fingerprint(), fingerprint(certified.dataset()).unwrap());
    }

    #[test]
    fn test_certify_rejects_schema_violation() {
        let err = certify(dataset(Value::Null)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatchError);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = fingerprint(&dataset(Value::Integer(39))).unwrap();
        let b = fingerprint(&dataset(Value::Integer(40))).unwrap();
        assert_ne!(a, b);
    }
}
