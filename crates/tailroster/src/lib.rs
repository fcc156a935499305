//! `tailroster` - Concurrent aircraft roster aggregation
//!
//! This library builds a working set of aircraft registrations, looks them all
//! up concurrently against a registration lookup service, and returns a capped
//! roster of the ones that resolved. A small in-memory credential store gates
//! access to the roster.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aircraft;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod pool;
pub mod roster;
pub mod session;

pub use aircraft::{AircraftRecord, Identifier};
pub use auth::{Account, AuthError, CredentialStore, DuplicatePolicy, LoginForm, RegistrationForm};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use lookup::{AircraftLookup, FetchError, HttpLookup};
pub use pool::IdentifierPool;
pub use roster::{load_roster, Roster, RosterAggregator, RosterState};
pub use session::Session;
