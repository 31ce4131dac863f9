//! Service layer.
//!
//! Business rules that sit between the HTTP routes and the store.

mod inventory_service;

pub use inventory_service::*;
