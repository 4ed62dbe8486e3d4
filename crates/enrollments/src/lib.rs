//! Core domain for the event enrollment service.
//!
//! An enrollment ties a user to the event together with at most one postal
//! address. Submitted addresses are validated against an external postal-code
//! lookup before anything is persisted; the orchestrator in [`service`]
//! combines the lookup with the enrollment and address stores and presents a
//! single success/failure outcome.

pub mod config;
pub mod domain;
pub mod error;
pub mod lookup;
pub mod repository;
pub mod service;
pub mod telemetry;

#[cfg(test)]
mod tests;
