//! Persistence layer for the storefront backend.
//!
//! Orders, payments, coupons, and stock levels are stored as versioned
//! documents. Writers read a document, mutate it, and write it back with a
//! compare-and-swap on the version; a mismatch surfaces as
//! [`StoreError::VersionConflict`] and the caller re-reads and retries.
//! Stock mutations are conditional in the store itself so availability
//! checks and decrements are atomic.

pub mod error;
pub mod memory;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use repository::{
    CouponRepository, OrderRepository, Page, PageRequest, PaymentRepository, StockRepository,
};
