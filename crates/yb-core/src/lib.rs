//! yellboard/crates/yb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for yellboard:
//! the polymorphic content graph, its counter-owning engines, and the
//! batched fuzzy-search protocol.

pub mod comments;
pub mod error;
pub mod models;
pub mod rating;
pub mod search;
pub mod store;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use comments::CommentEngine;
pub use error::*;
pub use models::*;
pub use rating::{
    RatingAction, RatingEngine, RatingOutcome, RatingReceipt, RatingState, RatingTransition,
    RatingValue, RowWrite,
};
pub use search::SearchService;
pub use store::ContentStore;
pub use traits::*;
