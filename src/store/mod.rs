pub mod jsonl;
pub mod types;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::question::{digest, Digest};
use types::Row;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store cannot be opened or read. Fatal for a run.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("row {0} not found")]
    RowNotFound(usize),
    #[error("store write failed: {0}")]
    Write(String),
}

/// Row-oriented question/answer store.
#[async_trait]
pub trait Sheet: Send + Sync {
    /// Every row, in store order. Positions index into this order.
    async fn rows(&self) -> Result<Vec<Row>, StoreError>;

    async fn append(&self, row: &Row) -> Result<(), StoreError>;

    /// Set the answer cell of the row at `position`.
    async fn update_answer(&self, position: usize, answer: &str) -> Result<(), StoreError>;
}

/// Digests of every question already in the store. Only grows.
#[derive(Debug, Default)]
pub struct StoreIndex {
    digests: HashSet<Digest>,
}

impl StoreIndex {
    pub fn from_rows(rows: &[Row]) -> Self {
        Self {
            digests: rows
                .iter()
                .filter(|r| !r.question.trim().is_empty())
                .map(|r| digest(&r.question))
                .collect(),
        }
    }

    /// Returns false when the digest was already known.
    pub fn insert(&mut self, digest: Digest) -> bool {
        self.digests.insert(digest)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_from_rows() {
        let rows = vec![
            Row {
                question: "What is Rust?".into(),
                ..Row::default()
            },
            Row::default(),
        ];
        let mut index = StoreIndex::from_rows(&rows);
        assert_eq!(index.len(), 1);
        assert!(!index.insert(digest("WHAT IS RUST?")));
        assert!(index.insert(digest("What is Go?")));
        assert_eq!(index.len(), 2);
    }
}
