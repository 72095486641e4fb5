//! Catalog gateway and drug knowledge base
//!
//! The dialogue layer reaches the storefront only through the
//! [`CatalogGateway`] trait and reads drug monographs through
//! [`KnowledgeBase`]. In-memory implementations of both are provided so the
//! assistant runs without an external backend.

pub mod catalog;
pub mod gateway;
pub mod knowledge;

pub use catalog::{CatalogSeed, InMemoryCatalog, OrderItem, SeedError, SeedOrder};
pub use gateway::{CatalogGateway, GatewayError, GatewayResult};
pub use knowledge::{InMemoryKnowledgeBase, KnowledgeBase, KnowledgeError};
