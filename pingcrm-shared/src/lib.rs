//! # PingCRM Shared Library
//!
//! Domain types and persistence for the PingCRM API.
//!
//! ## Module Organization
//!
//! - `models`: Accounts, users, organizations and contacts
//! - `store`: Record store traits with PostgreSQL and in-memory backends
//! - `jsonapi`: JSON:API documents and the record serializer
//! - `db`: Connection pool and embedded migrations
//! - `password`: Argon2id password hashing

pub mod db;
pub mod jsonapi;
pub mod models;
pub mod password;
pub mod store;

/// Current version of the PingCRM shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
