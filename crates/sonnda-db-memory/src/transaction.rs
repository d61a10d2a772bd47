//! Grant transactions.
//!
//! A transaction owns the grant tables' mutex guard from `begin` until it
//! commits or is dropped, so concurrent transitions of the same grant are
//! serialized. Changes are staged locally and only written to the tables on
//! commit.

use std::collections::HashMap;

use async_trait::async_trait;
use sonnda_auth::storage::GrantTransaction;
use sonnda_auth::types::{
    Grant, GrantId, GrantStatus, HistoryEntry, HistoryEntryId, NewHistoryEntry,
};
use sonnda_auth::{AuthError, AuthResult};
use time::OffsetDateTime;
use tokio::sync::OwnedMutexGuard;

use crate::storage::GrantTables;

/// A transaction over the in-memory grant tables.
pub struct InMemoryGrantTransaction {
    tables: OwnedMutexGuard<GrantTables>,
    staged_grants: HashMap<GrantId, Grant>,
    staged_history: Vec<HistoryEntry>,
}

impl InMemoryGrantTransaction {
    pub(crate) fn new(tables: OwnedMutexGuard<GrantTables>) -> Self {
        Self {
            tables,
            staged_grants: HashMap::new(),
            staged_history: Vec::new(),
        }
    }

    fn read(&self, id: GrantId) -> Option<&Grant> {
        self.staged_grants
            .get(&id)
            .or_else(|| self.tables.grants.get(&id))
    }
}

#[async_trait]
impl GrantTransaction for InMemoryGrantTransaction {
    async fn find_for_update(&mut self, id: GrantId) -> AuthResult<Option<Grant>> {
        Ok(self.read(id).cloned())
    }

    async fn update_status(
        &mut self,
        id: GrantId,
        expected: GrantStatus,
        new_status: GrantStatus,
        at: OffsetDateTime,
    ) -> AuthResult<Grant> {
        let current = self
            .read(id)
            .cloned()
            .ok_or_else(|| AuthError::not_found("grant", id))?;
        if current.status != expected {
            return Err(AuthError::conflict(format!(
                "grant {id} is {}, expected {expected}",
                current.status
            )));
        }

        let updated = current.with_status(new_status, at);
        self.staged_grants.insert(id, updated.clone());
        Ok(updated)
    }

    async fn insert_history(&mut self, entry: NewHistoryEntry) -> AuthResult<HistoryEntry> {
        if self.read(entry.grant_id).is_none() {
            return Err(AuthError::not_found("grant", entry.grant_id));
        }
        let next = self.tables.next_history_id + self.staged_history.len() as i64 + 1;
        let entry = entry.into_entry(HistoryEntryId::new(next));
        self.staged_history.push(entry.clone());
        Ok(entry)
    }

    async fn commit(self: Box<Self>) -> AuthResult<()> {
        let Self {
            mut tables,
            staged_grants,
            staged_history,
        } = *self;

        tables.next_history_id += staged_history.len() as i64;
        for (id, grant) in staged_grants {
            tables.grants.insert(id, grant);
        }
        for entry in staged_history {
            tables.history.entry(entry.grant_id).or_default().push(entry);
        }
        Ok(())
    }
}
