//! Internal helpers.

pub(crate) mod retry;
