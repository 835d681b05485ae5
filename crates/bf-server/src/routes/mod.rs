//! Route handlers for the HTTP API.

pub mod admin;
pub mod events;
pub mod extensions;
pub mod health;
pub mod runners;
