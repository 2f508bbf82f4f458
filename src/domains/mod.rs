//! Domains module containing business logic organized by bounded contexts.
//!
//! The server currently has a single domain: runtime-defined tools.

pub mod tools;
