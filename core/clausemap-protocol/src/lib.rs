#![cfg_attr(not(test), no_std)] // Shared with the wasm platform

extern crate alloc;

// Enable std if the feature is active (for tools)
#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod ids;
pub mod grammar;

// Re-export core types for convenience
pub use ids::{SentenceId, TokenId};
pub use grammar::*;

pub mod model;
pub use model::*;

pub mod slot;
pub use slot::*;
