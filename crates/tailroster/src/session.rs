//! Signed-in user state.
//!
//! A [`Session`] is created by the caller and handed to whatever needs it.
//! It records who is signed in and how many record detail views they opened.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::info;

use crate::auth::Account;

/// The current user and their activity counter.
#[derive(Debug, Default)]
pub struct Session {
    user: RwLock<Option<Account>>,
    detail_views: AtomicU64,
}

impl Session {
    /// Create a session with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign an authenticated account in, replacing any previous user.
    pub fn sign_in(&self, account: Account) {
        info!(username = %account.username, "Signed in");
        *self.user.write() = Some(account);
    }

    /// Sign the current user out, returning them.
    pub fn sign_out(&self) -> Option<Account> {
        let previous = self.user.write().take();
        if let Some(account) = &previous {
            info!(username = %account.username, "Signed out");
        }
        previous
    }

    /// Get the signed-in account.
    #[must_use]
    pub fn current_user(&self) -> Option<Account> {
        self.user.read().clone()
    }

    /// Check if anyone is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.read().is_some()
    }

    /// Greeting for the signed-in user.
    #[must_use]
    pub fn welcome_message(&self) -> Option<String> {
        self.user
            .read()
            .as_ref()
            .map(|account| format!("Welcome, {}", account.username))
    }

    /// Count one opened record detail view, returning the new total.
    pub fn record_detail_view(&self) -> u64 {
        self.detail_views.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of record detail views opened so far.
    #[must_use]
    pub fn detail_views(&self) -> u64 {
        self.detail_views.load(Ordering::SeqCst)
    }
}
