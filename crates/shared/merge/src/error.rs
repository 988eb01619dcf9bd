use thiserror::Error;

/// Shape errors found while merging
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("Element {index} of keyed list '{key}' is a {found}, expected an object (depth {depth})")]
    NonObjectListElement {
        key: String,
        index: usize,
        found: &'static str,
        depth: usize,
    },
}

pub type MergeResult<T> = std::result::Result<T, MergeError>;
