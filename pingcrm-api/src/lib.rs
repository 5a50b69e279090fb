//! # PingCRM API Server Library
//!
//! JSON:API backend for accounts, users, organizations and contacts.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and the JSON:API error envelope
//! - `middleware`: Error envelope enforcement and panic handling
//! - `response`: JSON:API response bodies
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
