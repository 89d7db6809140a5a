//! Test support utilities
//!
//! In-memory doubles for the exchange and persistence seams. Shipped as a
//! normal module so integration tests and downstream crates can drive the
//! credential manager without a network or a filesystem.

pub mod mocks;

pub use mocks::{MockCredentialStore, MockTokenExchanger};
