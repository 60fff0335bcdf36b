use std::path::Path;

use relbatch_core::TupleKey;
use serde::Deserialize;

/// A tuple as it appears in an operation file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TupleInput {
    pub user: String,
    pub relation: String,
    pub object: String,
}

/// Contents of a JSON operation file: `{ "writes": [...], "deletes": [...] }`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct OperationFile {
    pub writes: Vec<TupleInput>,
    pub deletes: Vec<TupleInput>,
}

impl OperationFile {
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| InputError::ReadFile(path.display().to_string(), e.to_string()))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, InputError> {
        let file: OperationFile =
            serde_json::from_str(contents).map_err(|e| InputError::ParseJson(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), InputError> {
        for (section, tuples) in [("writes", &self.writes), ("deletes", &self.deletes)] {
            for (index, tuple) in tuples.iter().enumerate() {
                for (field, value) in [
                    ("user", &tuple.user),
                    ("relation", &tuple.relation),
                    ("object", &tuple.object),
                ] {
                    if value.trim().is_empty() {
                        return Err(InputError::EmptyField {
                            section,
                            index,
                            field,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Splits the file into write keys and delete keys.
    pub fn into_keys(self) -> (Vec<TupleKey>, Vec<TupleKey>) {
        (
            self.writes.into_iter().map(TupleKey::from).collect(),
            self.deletes.into_iter().map(TupleKey::from).collect(),
        )
    }
}

impl From<TupleInput> for TupleKey {
    fn from(input: TupleInput) -> Self {
        TupleKey::new(input.user, input.relation, input.object)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read operation file '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse operation file: {0}")]
    ParseJson(String),

    #[error("{section}[{index}].{field} must not be empty")]
    EmptyField {
        section: &'static str,
        index: usize,
        field: &'static str,
    },
}
