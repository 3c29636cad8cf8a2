//! Mediaconv Database Layer
//!
//! Read and update access to the host's attachment records. The
//! [`AttachmentStore`] trait is what the conversion pipeline depends on;
//! [`AttachmentRepository`] implements it over a MySQL pool.

pub mod db;
pub mod store;

// Re-exports: repositories and setup
pub use db::{connect_pool, AttachmentRepository};

// Re-exports: Transaction utilities
pub use db::transaction::TransactionGuard;

// Re-exports: store trait
pub use store::AttachmentStore;
