//! In-memory credential store.
//!
//! Accounts are appended by registration and matched by exact username and
//! password. Nothing here is hardened: passwords are kept and compared as
//! plain text, and there is no lockout or rate limiting. The store gates
//! access to the roster; it is not a security boundary.
//!
//! Form validation (missing fields, mismatched confirmation) is checked
//! before the store is consulted, so callers can tell a validation problem
//! apart from a failed login.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AuthConfig;

/// Message for a login that matched no account.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// A registered account.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Username.
    pub username: String,
    /// Password, compared by exact match.
    pub password: String,
}

impl Account {
    /// Create a new account.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How registration treats a username that is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the registration with [`AuthError::UsernameTaken`].
    #[default]
    Reject,
    /// Append anyway. Authentication then matches the earliest account whose
    /// password fits, so a later account with the same username and password
    /// is unreachable.
    Allow,
}

/// Form field a validation message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    /// Username input.
    Username,
    /// Password input.
    Password,
    /// Password confirmation input.
    ConfirmPassword,
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Username => write!(f, "username"),
            Self::Password => write!(f, "password"),
            Self::ConfirmPassword => write!(f, "confirm_password"),
        }
    }
}

/// Per-field validation messages, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<FormField, String>,
}

impl FormErrors {
    /// Record a message for a field, replacing any earlier one.
    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    /// Get the message for a field.
    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Check if no field has a message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with a message.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over field messages in field order.
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.fields.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn into_result(self) -> Result<(), AuthError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(self))
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.fields.values().map(String::as_str).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Errors from login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The form was incomplete; the store was not consulted.
    #[error("{0}")]
    Validation(FormErrors),

    /// No account matched the username and password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The username is already registered.
    #[error("username '{username}' is already registered")]
    UsernameTaken {
        /// The rejected username.
        username: String,
    },
}

impl AuthError {
    /// Check if this error came from form validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Login form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Entered username.
    pub username: String,
    /// Entered password.
    pub password: String,
}

impl LoginForm {
    /// Create a login form.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check that both fields are filled in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] listing every missing field.
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = FormErrors::default();
        if self.username.is_empty() {
            errors.insert(FormField::Username, "Username is required");
        }
        if self.password.is_empty() {
            errors.insert(FormField::Password, "Password is required");
        }
        errors.into_result()
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    /// Chosen username.
    pub username: String,
    /// Chosen password.
    pub password: String,
    /// Password typed a second time.
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Create a registration form.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Check required fields and that the confirmation matches.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] listing every problem found.
    pub fn validate(&self) -> Result<(), AuthError> {
        let mut errors = FormErrors::default();
        if self.username.is_empty() {
            errors.insert(FormField::Username, "Username is required");
        }
        if self.password.is_empty() {
            errors.insert(FormField::Password, "Password is required");
        }
        if self.password != self.confirm_password {
            errors.insert(FormField::ConfirmPassword, "Passwords do not match");
        }
        errors.into_result()
    }
}

/// Append-only set of accounts.
///
/// All access goes through one mutex, so registration and authentication
/// are serialized against each other when the store is shared.
#[derive(Debug, Default)]
pub struct CredentialStore {
    policy: DuplicatePolicy,
    accounts: Mutex<Vec<Account>>,
}

impl CredentialStore {
    /// Create an empty store that rejects duplicate usernames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given duplicate policy.
    #[must_use]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            accounts: Mutex::new(Vec::new()),
        }
    }

    /// Create a store from configuration, registering the configured accounts.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] if the configured accounts repeat
    /// a username under [`DuplicatePolicy::Reject`].
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let store = Self::with_policy(config.duplicate_usernames);
        for account in &config.accounts {
            store.register(account.username.as_str(), account.password.as_str())?;
        }
        Ok(store)
    }

    /// Get the duplicate username policy.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] if the username exists and the
    /// policy is [`DuplicatePolicy::Reject`].
    pub fn register(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Account, AuthError> {
        let account = Account::new(username, password);
        let mut accounts = self.accounts.lock();

        if accounts.iter().any(|a| a.username == account.username) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    debug!(username = %account.username, "Rejected duplicate registration");
                    return Err(AuthError::UsernameTaken {
                        username: account.username,
                    });
                }
                DuplicatePolicy::Allow => {
                    debug!(username = %account.username, "Registering duplicate username");
                }
            }
        }

        accounts.push(account.clone());
        info!(username = %account.username, total = accounts.len(), "Registered account");
        Ok(account)
    }

    /// Find the first account matching both username and password exactly.
    #[must_use]
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Account> {
        let found = self
            .accounts
            .lock()
            .iter()
            .find(|a| a.username == username && a.password == password)
            .cloned();

        debug!(username, matched = found.is_some(), "Authentication attempt");
        found
    }

    /// Validate a login form, then authenticate it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for missing fields (the store is not
    /// consulted) or [`AuthError::InvalidCredentials`] when nothing matches.
    pub fn login(&self, form: &LoginForm) -> Result<Account, AuthError> {
        form.validate()?;
        self.authenticate(&form.username, &form.password)
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Validate a registration form, then register it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for an incomplete form or
    /// [`AuthError::UsernameTaken`] per the duplicate policy.
    pub fn sign_up(&self, form: &RegistrationForm) -> Result<Account, AuthError> {
        form.validate()?;
        self.register(form.username.as_str(), form.password.as_str())
    }

    /// Check if any account uses the username.
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.accounts.lock().iter().any(|a| a.username == username)
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.lock().len()
    }

    /// Check if no accounts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.lock().is_empty()
    }
}
