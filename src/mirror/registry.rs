//! Process-wide mapping from local cache path to live mirror.
//!
//! Owned by the server instance and passed explicitly to the handlers, so
//! every test gets a fresh registry. Creation is safe under concurrent
//! calls: the map entry decides the winner and losers simply discard their
//! construct (the filesystem side effects only happen later, under the
//! mirror's own lock, in `open`).

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use url::Url;

use crate::git::GitRunner;
use crate::mirror::repository::Mirror;
use crate::mirror::urls::{canonical_upstream_url, local_mirror_path};
use crate::ops::OperationLogger;

pub struct MirrorRegistry {
    cache_root: PathBuf,
    mirrors: DashMap<PathBuf, Arc<Mirror>>,
    runner: GitRunner,
    http: reqwest::Client,
    ops: Arc<dyn OperationLogger>,
}

impl MirrorRegistry {
    pub fn new(
        cache_root: PathBuf,
        runner: GitRunner,
        http: reqwest::Client,
        ops: Arc<dyn OperationLogger>,
    ) -> Self {
        Self {
            cache_root,
            mirrors: DashMap::new(),
            runner,
            http,
            ops,
        }
    }

    /// Is a mirror registered for this upstream URL?
    pub fn exists(&self, url: &Url) -> bool {
        let canonical = canonical_upstream_url(url);
        self.mirrors
            .contains_key(&local_mirror_path(&self.cache_root, &canonical))
    }

    /// The registered mirror for this upstream URL, if any.
    pub fn get(&self, url: &Url) -> Option<Arc<Mirror>> {
        let canonical = canonical_upstream_url(url);
        self.mirrors
            .get(&local_mirror_path(&self.cache_root, &canonical))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Look up the mirror for `url`, creating it if absent. The creating
    /// credential decides the privacy of a fresh mirror; an existing mirror
    /// is returned unchanged.
    pub fn get_or_create(&self, url: &Url, auth: Option<&str>) -> Arc<Mirror> {
        let canonical = canonical_upstream_url(url);
        let path = local_mirror_path(&self.cache_root, &canonical);
        let entry = self.mirrors.entry(path.clone()).or_insert_with(|| {
            Arc::new(Mirror::new(
                path,
                canonical,
                auth,
                self.runner.clone(),
                self.http.clone(),
                Arc::clone(&self.ops),
            ))
        });
        Arc::clone(entry.value())
    }

    /// Number of registered mirrors.
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
