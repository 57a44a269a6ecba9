//! Core library for homedash.
//!
//! Owns the dashboard configuration document and the security invariant
//! around it: credential values stored in widget configs never reach a client
//! unless that client is supplying a new one. Contains the typed document
//! model, the secret schema registry, the redactor, the admin filter, the
//! global item index, the save-time reconciler, optional secret sealing, and
//! the [`engine::ConfigEngine`] facade that ties them to storage.

pub mod crypto;
pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod persistence;
pub mod reconcile;
pub mod redact;
pub mod schema;
pub mod visit;
