//! Journal domain entities persisted through the mapper.
//!
//! # Responsibility
//! - Declare the field descriptors, natural keys and relations of every
//!   record the organizer stores.
//!
//! # Invariants
//! - Every entity starts transient (`id == 0`); ids come from the mapper.
//! - Descriptor order is the column order of the entity's table.

pub mod book;
pub mod category;
pub mod creator;
pub mod session;
