//! Demo server for cognito-gate.
//!
//! A tiny application whose pages are only reachable after logging in
//! through the configured Cognito user pool.

pub mod config;
pub mod pages;
