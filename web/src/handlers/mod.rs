//! HTTP request handlers, organized by audience.

pub mod health;
pub mod merchant;
pub mod offers;
pub mod reservations;

pub use health::{health_check, readiness_check};
