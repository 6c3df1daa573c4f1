//! Cross-crate ambient concerns shared by `fair_group` and `fair_queue`.
//!
//! Kept deliberately small: logging bootstrap and a correlation id type,
//! the same split the rest of the workspace used to reach for before this
//! crate existed as a standalone dependency.

pub mod logger;
