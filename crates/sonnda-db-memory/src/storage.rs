use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use sonnda_auth::storage::{CredentialStore, GrantStore, GrantTransaction, PatientDirectory};
use sonnda_auth::types::{
    Grant, GrantId, HistoryEntry, Identity, IdentityId, NewGrant, NewIdentity, PatientId,
};
use sonnda_auth::{AuthError, AuthResult};
use tokio::sync::Mutex;

use crate::transaction::InMemoryGrantTransaction;

/// Grants and their history, guarded together.
#[derive(Debug, Default)]
pub(crate) struct GrantTables {
    pub(crate) grants: BTreeMap<GrantId, Grant>,
    pub(crate) history: HashMap<GrantId, Vec<HistoryEntry>>,
    pub(crate) next_grant_id: i64,
    pub(crate) next_history_id: i64,
}

impl GrantTables {
    pub(crate) fn allocate_grant_id(&mut self) -> GrantId {
        self.next_grant_id += 1;
        GrantId::new(self.next_grant_id)
    }
}

/// In-memory storage for identities, grants and patient ownership.
///
/// This storage implementation provides:
/// - Lock-free identity lookups via papaya::HashMap
/// - An email uniqueness constraint arbitrated by `try_insert`
/// - Grant transactions that hold the grant tables exclusively until they
///   commit or are dropped
#[derive(Debug)]
pub struct InMemoryAuthStorage {
    /// Identities keyed by normalised email
    identities: Arc<PapayaHashMap<String, Identity>>,
    /// Secondary index: identity id -> email
    identity_emails: Arc<PapayaHashMap<IdentityId, String>>,
    /// Patient record -> owning identity
    patients: Arc<PapayaHashMap<PatientId, IdentityId>>,
    /// Grants and history
    grants: Arc<Mutex<GrantTables>>,
    /// Atomic counter for identity ids
    identity_counter: AtomicI64,
}

impl InMemoryAuthStorage {
    pub fn new() -> Self {
        Self {
            identities: Arc::new(PapayaHashMap::new()),
            identity_emails: Arc::new(PapayaHashMap::new()),
            patients: Arc::new(PapayaHashMap::new()),
            grants: Arc::new(Mutex::new(GrantTables::default())),
            identity_counter: AtomicI64::new(1),
        }
    }

    /// Records that `owner` owns the patient record `patient`.
    ///
    /// Replaces any previous owner.
    pub fn register_patient(&self, patient: PatientId, owner: IdentityId) {
        self.patients.pin().insert(patient, owner);
    }

    /// Number of registered identities.
    pub fn identity_count(&self) -> usize {
        self.identities.pin().len()
    }

    fn next_identity_id(&self) -> IdentityId {
        IdentityId::new(self.identity_counter.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for InMemoryAuthStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryAuthStorage {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Identity>> {
        Ok(self.identities.pin().get(email).cloned())
    }

    async fn find_by_id(&self, id: IdentityId) -> AuthResult<Option<Identity>> {
        let Some(email) = self.identity_emails.pin().get(&id).cloned() else {
            return Ok(None);
        };
        Ok(self
            .identities
            .pin()
            .get(&email)
            .filter(|identity| identity.id == id)
            .cloned())
    }

    async fn insert(&self, identity: NewIdentity) -> AuthResult<Identity> {
        let identity = identity.into_identity(self.next_identity_id());

        let inserted = self
            .identities
            .pin()
            .try_insert(identity.email.clone(), identity.clone())
            .is_ok();
        if !inserted {
            return Err(AuthError::duplicate_key(format!("email {}", identity.email)));
        }

        self.identity_emails
            .pin()
            .insert(identity.id, identity.email.clone());
        tracing::trace!(identity_id = %identity.id, "Stored identity");
        Ok(identity)
    }
}

#[async_trait]
impl PatientDirectory for InMemoryAuthStorage {
    async fn owner_of(&self, patient: PatientId) -> AuthResult<Option<IdentityId>> {
        Ok(self.patients.pin().get(&patient).copied())
    }
}

#[async_trait]
impl GrantStore for InMemoryAuthStorage {
    async fn insert(&self, grant: NewGrant) -> AuthResult<Grant> {
        let mut tables = self.grants.lock().await;
        let grant = grant.into_grant(tables.allocate_grant_id());
        tables.grants.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn find_by_id(&self, id: GrantId) -> AuthResult<Option<Grant>> {
        Ok(self.grants.lock().await.grants.get(&id).cloned())
    }

    async fn find_most_recent(
        &self,
        grantee: IdentityId,
        patient: PatientId,
    ) -> AuthResult<Option<Grant>> {
        let tables = self.grants.lock().await;
        Ok(tables
            .grants
            .values()
            .filter(|g| g.grantee == grantee && g.patient == patient)
            .max_by_key(|g| (g.requested_at, g.id))
            .cloned())
    }

    async fn list_for_patient(&self, patient: PatientId) -> AuthResult<Vec<Grant>> {
        let tables = self.grants.lock().await;
        let mut grants: Vec<Grant> = tables
            .grants
            .values()
            .filter(|g| g.patient == patient)
            .cloned()
            .collect();
        grants.sort_by(|a, b| (b.requested_at, b.id).cmp(&(a.requested_at, a.id)));
        Ok(grants)
    }

    async fn list_history(&self, grant_id: GrantId) -> AuthResult<Vec<HistoryEntry>> {
        let tables = self.grants.lock().await;
        Ok(tables.history.get(&grant_id).cloned().unwrap_or_default())
    }

    async fn begin(&self) -> AuthResult<Box<dyn GrantTransaction>> {
        let guard = Arc::clone(&self.grants).lock_owned().await;
        Ok(Box::new(InMemoryGrantTransaction::new(guard)))
    }
}
