use std::sync::Arc;

use bitme_core::{MissPolicy, UrlStore};
use bitme_generator::CodeGenerator;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn UrlStore>,
    short_codes: Arc<dyn CodeGenerator>,
    admin_codes: Arc<dyn CodeGenerator>,
    miss_policy: MissPolicy,
}

impl AppState {
    pub fn new(
        store: Arc<dyn UrlStore>,
        short_codes: Arc<dyn CodeGenerator>,
        admin_codes: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self {
            store,
            short_codes,
            admin_codes,
            miss_policy: MissPolicy::default(),
        }
    }

    /// Sets the policy applied to lookups made by the read handlers.
    pub fn with_miss_policy(mut self, miss_policy: MissPolicy) -> Self {
        self.miss_policy = miss_policy;
        self
    }

    pub fn store(&self) -> &dyn UrlStore {
        self.store.as_ref()
    }

    pub fn miss_policy(&self) -> MissPolicy {
        self.miss_policy
    }

    /// Draws a fresh `(short_url, admin_url)` pair.
    pub fn next_codes(&self) -> (String, String) {
        (self.short_codes.generate(), self.admin_codes.generate())
    }
}
