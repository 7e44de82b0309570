//! Library exports for the FormCoach client core, shared between the binary and tests.

pub mod auth;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod guards;
pub mod models;
pub mod repository;
pub mod session;
pub mod startup;
pub mod state;
pub mod utils;
