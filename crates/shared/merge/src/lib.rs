//! apiscout Document Merge
//!
//! Recursive merge of two object graphs, used to layer default templates onto
//! generated gateway objects and to reconcile a freshly generated definition
//! with the copy the gateway already stores.

mod error;
mod merger;

pub use error::{MergeError, MergeResult};
pub use merger::{KEYED_LIST_KEYS, LIST_KEY_FIELD, merge};
