//! Route handlers for the request intake.

pub mod download;
pub mod health;
