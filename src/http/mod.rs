//! HTTP layer: the smart-HTTP endpoint and the per-command dispatcher.
//!
//! [`handler`] owns the axum router, path-suffix routing, auth extraction
//! and body decoding; [`dispatch`] implements the `ls-refs` / `fetch`
//! semantics including the want-wait loop.

pub mod dispatch;
pub mod handler;
