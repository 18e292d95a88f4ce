//! Managed mirror repositories and the process-wide registry.
//!
//! One bare mirror clone per unique upstream URL, plus the in-memory
//! registry that maps local cache paths to live mirror handles. All on-disk
//! state is the bare repository itself; registry metadata (access lists,
//! public flags, last-update times) lives only in memory and is rebuilt
//! lazily after a restart.

pub mod registry;
pub mod repository;
pub mod urls;

pub use registry::MirrorRegistry;
pub use repository::Mirror;
