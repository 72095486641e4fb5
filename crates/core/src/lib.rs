//! Core types for the pharmacy assistant
//!
//! This crate provides the types shared by every other crate:
//! - Intent taxonomy
//! - Catalog, cart and order records
//! - Query analysis and structured entities
//! - Dispatcher results and caller identity
//! - Conversation turns
//! - Drug knowledge records
//! - Feedback kinds

pub mod analysis;
pub mod catalog;
pub mod conversation;
pub mod dialogue;
pub mod feedback;
pub mod intent;
pub mod knowledge;

pub use analysis::{QueryAnalysis, Resolution, StructuredEntities};
pub use catalog::{
    Cart, CartLine, CartUpdate, CustomerId, CustomerProfile, OrderId, OrderStatus, OrderSummary,
    OrderTracking, Product, ProductId, ProductType, ReorderOutcome, Substitute, SubstituteList,
    TrackingStage,
};
pub use conversation::{ContextSummary, Turn};
pub use dialogue::{AuthContext, DialoguePayload, DialogueResult, InteractiveComponent};
pub use feedback::{FeedbackKind, FeedbackPayload};
pub use intent::Intent;
pub use knowledge::{DrugData, KnowledgeEntry};
