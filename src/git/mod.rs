//! Git subprocess plumbing.
//!
//! All repository work shells out to the system `git` binary using
//! `tokio::process::Command`. Credentials are threaded per invocation via a
//! `-c http.extraHeader` config argument so nothing is ever persisted.

pub mod runner;

pub use runner::{locate_git_binary, GitRunner};
