use std::sync::Arc;

use tbl_types::Scalar;

use crate::{DataFrame, Schema};

/// One materialized row: owned values plus the frame's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<Scalar>,
}

impl Row {
    pub(crate) fn new(schema: Arc<Schema>, values: Vec<Scalar>) -> Self {
        Self { schema, values }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.schema
            .index_of(name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_at(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Scalar> {
        self.values
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Lazy row iterator; each call to [`DataFrame::rows`] starts over.
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    frame: &'a DataFrame,
    schema: Arc<Schema>,
    next: usize,
}

impl<'a> Rows<'a> {
    pub(crate) fn new(frame: &'a DataFrame) -> Self {
        Self {
            frame,
            schema: Arc::new(frame.schema()),
            next: 0,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.next >= self.frame.height() {
            return None;
        }
        let idx = self.next;
        self.next += 1;
        let values = self
            .frame
            .iter()
            .map(|series| series.get(idx).cloned().unwrap_or(Scalar::Null))
            .collect();
        Some(Row::new(Arc::clone(&self.schema), values))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.frame.height().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}
