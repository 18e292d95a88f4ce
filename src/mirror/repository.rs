//! One managed bare mirror of an upstream repository.
//!
//! The mirror's single `RwLock` guards its mutable metadata and serializes
//! initialization, upstream fetches, and bundle recovery, which also
//! enforces the at-most-one-fetch-per-mirror invariant. Local serving runs
//! without any lock so read clients are never stalled behind a fetch; the
//! synthetic capability advertisement compensates by not offering
//! `ref-in-want` (see the HTTP layer).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use crate::errors::ProxyError;
use crate::git::GitRunner;
use crate::ops::{NoopOperation, OperationLogger, RunningOperation};
use crate::protocol::pktline::{self, PktLine};
use crate::protocol::request::CommandRequest;

/// Repository config applied once at initialization.
const INIT_CONFIG: [(&str, &str); 5] = [
    ("protocol.version", "2"),
    ("uploadpack.allowfilter", "1"),
    ("uploadpack.allowrefinwant", "1"),
    ("repack.writebitmaps", "1"),
    // libcurl and HTTP/2 don't get along for some upstreams.
    ("http.version", "HTTP/1.1"),
];

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

/// Mutable attributes guarded by the per-mirror lock.
#[derive(Debug)]
struct MirrorMeta {
    last_update: Option<DateTime<Utc>>,
    is_public: bool,
    access_list: Vec<String>,
}

pub struct Mirror {
    local_path: PathBuf,
    upstream_url: Url,
    runner: GitRunner,
    http: reqwest::Client,
    ops: Arc<dyn OperationLogger>,
    mu: RwLock<MirrorMeta>,
}

impl Mirror {
    /// Construct an in-memory mirror record. No filesystem side effects
    /// happen until [`Mirror::open`].
    ///
    /// An unauthenticated creator yields a public mirror with an empty
    /// access list; an authenticated creator yields a private mirror whose
    /// sole initial entry is the creating credential.
    pub(crate) fn new(
        local_path: PathBuf,
        upstream_url: Url,
        auth: Option<&str>,
        runner: GitRunner,
        http: reqwest::Client,
        ops: Arc<dyn OperationLogger>,
    ) -> Self {
        let meta = match auth {
            Some(auth) => MirrorMeta {
                last_update: None,
                is_public: false,
                access_list: vec![auth.to_string()],
            },
            None => MirrorMeta {
                last_update: None,
                is_public: true,
                access_list: Vec::new(),
            },
        };
        Self {
            local_path,
            upstream_url,
            runner,
            http,
            ops,
            mu: RwLock::new(meta),
        }
    }

    pub fn upstream_url(&self) -> &Url {
        &self.upstream_url
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Completion time of the most recent successful upstream fetch.
    pub async fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.mu.read().await.last_update
    }

    pub async fn is_public(&self) -> bool {
        self.mu.read().await.is_public
    }

    pub async fn has_access(&self, auth: &str) -> bool {
        self.mu
            .read()
            .await
            .access_list
            .iter()
            .any(|entry| entry == auth)
    }

    /// Record an observed credential. Takes the write lock; the list only
    /// grows and never holds duplicates.
    pub async fn add_access(&self, auth: &str) {
        let mut meta = self.mu.write().await;
        if !meta.access_list.iter().any(|entry| entry == auth) {
            meta.access_list.push(auth.to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Initialize the on-disk bare repository if it does not exist yet.
    #[instrument(skip(self), fields(path = %self.local_path.display()))]
    pub async fn open(&self) -> Result<(), ProxyError> {
        let _meta = self.mu.write().await;

        match std::fs::metadata(&self.local_path) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ProxyError::Internal(anyhow!(
                    "error while probing the local repository: {e}"
                )))
            }
        }

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o750);
        }
        builder
            .create(&self.local_path)
            .map_err(|e| ProxyError::Internal(anyhow!("cannot create a cache dir: {e}")))?;

        let op = NoopOperation;
        self.runner
            .run(&op, &self.local_path, None, &["init", "--bare"])
            .await?;
        for (key, value) in INIT_CONFIG {
            self.runner
                .run(&op, &self.local_path, None, &["config", key, value])
                .await?;
        }
        self.runner
            .run(
                &op,
                &self.local_path,
                None,
                &[
                    "remote",
                    "add",
                    "--mirror=fetch",
                    "origin",
                    self.upstream_url.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Upstream
    // -----------------------------------------------------------------------

    /// Forward an `ls-refs` command to the upstream and return its parsed
    /// response chunks.
    pub async fn ls_refs_upstream(
        &self,
        command: &CommandRequest,
        auth: Option<&str>,
    ) -> Result<Vec<PktLine>, ProxyError> {
        use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};

        let endpoint = format!("{}/git-upload-pack", self.upstream_url);
        let mut request = self
            .http
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/x-git-upload-pack-request")
            .header(ACCEPT, "application/x-git-upload-pack-result")
            .header("Git-Protocol", "version=2")
            .body(command.to_pkt_bytes());
        if let Some(auth) = auth {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProxyError::Internal(anyhow!("cannot send a request to the upstream: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let mut message = String::new();
            let is_html = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("text/html"));
            if is_html {
                message = response.text().await.unwrap_or_default();
            }
            return Err(ProxyError::from_upstream_status(status.as_u16(), message));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Internal(anyhow!("cannot read the upstream response: {e}")))?;
        pktline::decode_pkt_lines(&body)
            .map_err(|e| ProxyError::Internal(anyhow!("cannot parse the upstream response: {e}")))
    }

    /// Fetch everything from `origin` into the mirror. The write lock is
    /// held across the git runs, so fetches are serialized per mirror.
    #[instrument(skip_all, fields(upstream = %self.upstream_url))]
    pub async fn fetch_upstream(&self, auth: Option<&str>) -> Result<(), ProxyError> {
        let op = self.ops.start("FetchUpstream", &self.upstream_url);
        let result = self.fetch_upstream_inner(op.as_ref(), auth).await;
        op.done(result.as_ref().err());
        result
    }

    async fn fetch_upstream_inner(
        &self,
        op: &dyn RunningOperation,
        auth: Option<&str>,
    ) -> Result<(), ProxyError> {
        // An initial broad fetch into an empty mirror is slow on some
        // upstream servers; fetch heads and changes first when HEAD does
        // not resolve yet.
        let split_fetch = self.resolve_ref("HEAD").await?.is_none();

        let mut meta = self.mu.write().await;
        if split_fetch {
            self.runner
                .run(
                    op,
                    &self.local_path,
                    auth,
                    &[
                        "fetch",
                        "--progress",
                        "-f",
                        "-n",
                        "origin",
                        "refs/heads/*:refs/heads/*",
                        "refs/changes/*:refs/changes/*",
                    ],
                )
                .await?;
        }
        self.runner
            .run(
                op,
                &self.local_path,
                auth,
                &["fetch", "--progress", "-f", "origin"],
            )
            .await?;

        meta.last_update = Some(Utc::now());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Local introspection
    // -----------------------------------------------------------------------

    /// Does the upstream advertisement reveal any reference we do not have
    /// locally at the same hash? A locally unknown reference is an update,
    /// not an error.
    pub async fn has_any_update(
        &self,
        refs: &HashMap<String, String>,
    ) -> Result<bool, ProxyError> {
        let local = self.local_ref_snapshot().await?;
        for (name, hash) in refs {
            let local_hash = match local.get(name) {
                Some(found) => Some(found.clone()),
                // HEAD and other symbolic refs are not listed by
                // for-each-ref; resolve them individually.
                None => self.resolve_ref(name).await?,
            };
            match local_hash {
                None => return Ok(true),
                Some(found) if found != *hash => return Ok(true),
                Some(_) => {}
            }
        }
        Ok(false)
    }

    /// True iff every wanted object exists and every wanted reference
    /// resolves locally. Missing is `false`, not an error.
    pub async fn has_all_wants(
        &self,
        hashes: &[String],
        refs: &[String],
    ) -> Result<bool, ProxyError> {
        for hash in hashes {
            let found = self
                .runner
                .query(&self.local_path, &["cat-file", "-e", hash])
                .await?;
            if found.is_none() {
                return Ok(false);
            }
        }
        for name in refs {
            if self.resolve_ref(name).await?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Map of local reference name to object id.
    async fn local_ref_snapshot(&self) -> Result<HashMap<String, String>, ProxyError> {
        let output = self
            .runner
            .query(
                &self.local_path,
                &["for-each-ref", "--format=%(objectname) %(refname)"],
            )
            .await?
            .unwrap_or_default();

        let mut refs = HashMap::new();
        for line in output.lines() {
            if let Some((oid, name)) = line.trim().split_once(' ') {
                refs.insert(name.trim().to_string(), oid.trim().to_string());
            }
        }
        Ok(refs)
    }

    async fn resolve_ref(&self, name: &str) -> Result<Option<String>, ProxyError> {
        let resolved = self
            .runner
            .query(
                &self.local_path,
                &["rev-parse", "--verify", "--quiet", name],
            )
            .await?;
        Ok(resolved.map(|s| s.trim().to_string()))
    }

    // -----------------------------------------------------------------------
    // Local serve
    // -----------------------------------------------------------------------

    /// Serve a `fetch` command from the local mirror by piping it through
    /// `git upload-pack --stateless-rpc`. Runs lockless: a fetch may commit
    /// refs while upload-pack enumerates, which is safe for hash-wants
    /// because objects are resolved against the object database at
    /// enumeration time.
    pub async fn serve_local(
        &self,
        command: &CommandRequest,
        out: &mut Vec<u8>,
    ) -> Result<(), ProxyError> {
        let mut cmd = Command::new(self.runner.binary());
        cmd.arg("upload-pack")
            .arg("--stateless-rpc")
            .arg(&self.local_path);
        cmd.env_clear();
        cmd.env("GIT_PROTOCOL", "version=2");
        cmd.current_dir(&self.local_path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd
            .spawn()
            .map_err(|e| ProxyError::Internal(anyhow!("failed to spawn git upload-pack: {e}")))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProxyError::Internal(anyhow!("upload-pack stdin pipe missing")))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProxyError::Internal(anyhow!("upload-pack stdout pipe missing")))?;

        let input = command.to_pkt_bytes();
        let write = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await?;
            Ok::<_, std::io::Error>(())
        };
        let read = async {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        };
        let (written, packed) = tokio::join!(write, read);
        written
            .map_err(|e| ProxyError::Internal(anyhow!("failed to write to upload-pack: {e}")))?;
        let packed = packed
            .map_err(|e| ProxyError::Internal(anyhow!("failed to read from upload-pack: {e}")))?;

        let status = child
            .wait()
            .await
            .map_err(|e| ProxyError::Internal(anyhow!("failed to wait on upload-pack: {e}")))?;
        if !status.success() {
            return Err(ProxyError::CommandFailed {
                command: "upload-pack --stateless-rpc".to_string(),
                status,
                stderr: String::new(),
            });
        }

        out.extend_from_slice(&packed);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bundles
    // -----------------------------------------------------------------------

    /// Import all refs from a bundle file into the mirror.
    pub async fn recover_from_bundle(
        &self,
        bundle_path: &Path,
        auth: Option<&str>,
    ) -> Result<(), ProxyError> {
        let op = self.ops.start("ReadBundle", &self.upstream_url);
        let bundle = bundle_path.display().to_string();
        let result = async {
            let _meta = self.mu.write().await;
            self.runner
                .run(
                    op.as_ref(),
                    &self.local_path,
                    auth,
                    &["fetch", "--progress", "-f", &bundle, "refs/*:refs/*"],
                )
                .await
        }
        .await;
        op.done(result.as_ref().err());
        result
    }

    /// Export the whole mirror as a bundle, streamed to `out`.
    pub async fn write_bundle(
        &self,
        out: &mut Vec<u8>,
        auth: Option<&str>,
    ) -> Result<(), ProxyError> {
        let op = self.ops.start("CreateBundle", &self.upstream_url);
        let result = self
            .runner
            .run_with_stdout(
                op.as_ref(),
                out,
                &self.local_path,
                auth,
                &["bundle", "create", "-", "--all"],
            )
            .await;
        op.done(result.as_ref().err());
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
