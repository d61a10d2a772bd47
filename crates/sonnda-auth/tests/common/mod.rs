#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sonnda_auth::config::{AuthConfig, PasswordConfig, SigningSecret};
use sonnda_auth::prelude::*;
use sonnda_db_memory::InMemoryAuthStorage;
use time::OffsetDateTime;
use time::macros::datetime;

pub const SECRET: &str = "integration-secret-32-bytes-long";

pub const T0: OffsetDateTime = datetime!(2024-03-01 09:00 UTC);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Configuration with cheap hashing and a one-hour approval window.
pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig {
        signing_secret: SigningSecret::new(SECRET),
        password: PasswordConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
            ..PasswordConfig::default()
        },
        ..AuthConfig::default()
    };
    config.ledger.approval_ttl = Some(Duration::from_secs(3600));
    config
}

/// Every component wired over one in-memory store and a manual clock.
pub struct Harness {
    pub storage: Arc<InMemoryAuthStorage>,
    pub clock: Arc<ManualClock>,
    pub config: AuthConfig,
    pub credentials: CredentialManager,
    pub tokens: Arc<TokenService>,
    pub ledger: Arc<AuthorizationLedger>,
    pub gate: Arc<AccessGate>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        init_tracing();
        let storage = Arc::new(InMemoryAuthStorage::new());
        let clock = Arc::new(ManualClock::new(T0));

        let credentials =
            CredentialManager::new(storage.clone(), &config, clock.clone()).unwrap();
        let tokens = Arc::new(TokenService::from_config(&config, clock.clone()).unwrap());
        let ledger = Arc::new(AuthorizationLedger::new(
            storage.clone(),
            &config,
            clock.clone(),
        ));
        let gate = Arc::new(AccessGate::new(
            tokens.clone(),
            ledger.clone(),
            storage.clone(),
            &config,
        ));

        Self {
            storage,
            clock,
            config,
            credentials,
            tokens,
            ledger,
            gate,
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Registers an identity with password `password1`.
    pub async fn register(&self, email: &str, role: Role) -> Identity {
        self.credentials
            .register(email, "password1", role)
            .await
            .unwrap()
    }

    /// Logs in and authenticates the resulting token.
    pub async fn actor(&self, email: &str) -> ActorContext {
        let outcome = self
            .credentials
            .login(&self.tokens, email, "password1")
            .await
            .unwrap();
        self.gate.authenticate(&outcome.access_token).unwrap()
    }
}
