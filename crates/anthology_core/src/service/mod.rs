//! Service layer for journal use-cases.
//!
//! # Responsibility
//! - Provide stable use-case entry points on top of the mapper.
//! - Keep callers (CLI, UI) free of relation-direction details.

pub mod catalog_service;
