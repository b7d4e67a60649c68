use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tbl_types::{DataType, Field};

use crate::FrameError;

/// Ordered `name -> dtype` mapping. Frames derive it on demand and never
/// store it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn from_fields(fields: Vec<Field>) -> Result<Self, FrameError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(FrameError::DuplicateColumn(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = (S, DataType)>,
        S: Into<String>,
    {
        Self::from_fields(
            pairs
                .into_iter()
                .map(|(name, dtype)| Field::new(name, dtype))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.dtype)
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|field| field.name.as_str())
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use tbl_types::DataType;

    use super::Schema;
    use crate::FrameError;

    #[test]
    fn lookup_by_name_and_position() {
        let schema = Schema::from_pairs([("a", DataType::Int64), ("b", DataType::Utf8)])
            .expect("schema");
        assert_eq!(schema.get("b"), Some(&DataType::Utf8));
        assert_eq!(schema.index_of("a"), Some(0));
        assert!(!schema.contains("c"));
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Schema::from_pairs([("a", DataType::Int64), ("a", DataType::Utf8)])
            .expect_err("duplicate");
        assert!(matches!(err, FrameError::DuplicateColumn(name) if name == "a"));
    }
}
