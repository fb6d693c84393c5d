//! Order book cache owned by the dispatch loop.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::book::{BookUpdate, LocalBook};
use super::id::TokenId;

/// Per-contract book cache.
///
/// Single writer: only the event loop mutates it, so there is no lock.
/// Entries never expire; a book is as fresh as the last message for it.
#[derive(Debug, Default)]
pub struct BookCache {
    books: HashMap<TokenId, LocalBook>,
}

impl BookCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update to a contract's book, creating it on first sight.
    pub fn update(&mut self, token_id: TokenId, update: BookUpdate, now: DateTime<Utc>) -> TokenId {
        self.books
            .entry(token_id.clone())
            .or_insert_with(|| LocalBook::new(token_id.clone()))
            .apply(update, now);
        token_id
    }

    /// Apply a batch of updates from one feed message.
    ///
    /// Returns each touched token once, in first-seen order.
    pub fn apply(
        &mut self,
        updates: impl IntoIterator<Item = (TokenId, BookUpdate)>,
        now: DateTime<Utc>,
    ) -> Vec<TokenId> {
        let mut seen = HashSet::new();
        let mut touched = Vec::new();
        for (token_id, update) in updates {
            let token_id = self.update(token_id, update, now);
            if seen.insert(token_id.clone()) {
                touched.push(token_id);
            }
        }
        touched
    }

    #[must_use]
    pub fn get(&self, token_id: &TokenId) -> Option<&LocalBook> {
        self.books.get(token_id)
    }

    /// Number of books in cache
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
