//! Per-command semantics for `ls-refs` and `fetch`.
//!
//! `ls-refs` is always proxied to the upstream: it is cheap, and answering
//! it from the mirror would risk advertising stale references. `fetch` is
//! served from the local mirror, but only once every wanted object and
//! reference is materialized there; the want-wait loop gates local serving
//! on a concurrently running upstream fetch, re-checking want satisfaction
//! at every event so a warm mirror answers without waiting for the full
//! fetch to finish.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::ProxyError;
use crate::metrics::Metrics;
use crate::mirror::Mirror;
use crate::protocol::pktline::{self, PktLine};
use crate::protocol::request::CommandRequest;

/// Handle one parsed protocol v2 command, appending the response chunks to
/// `out`.
pub async fn handle_command(
    mirror: &Arc<Mirror>,
    command: &CommandRequest,
    out: &mut Vec<u8>,
    auth: Option<&str>,
    check_interval: Duration,
    cancel: &CancellationToken,
    metrics: &Arc<Metrics>,
) -> Result<(), ProxyError> {
    match command.command() {
        "ls-refs" => handle_ls_refs(mirror, command, out, auth, metrics).await,
        "fetch" => handle_fetch(mirror, command, out, auth, check_interval, cancel, metrics).await,
        other => Err(ProxyError::Internal(anyhow!("unknown command: {other}"))),
    }
}

// ---------------------------------------------------------------------------
// ls-refs
// ---------------------------------------------------------------------------

async fn handle_ls_refs(
    mirror: &Arc<Mirror>,
    command: &CommandRequest,
    out: &mut Vec<u8>,
    auth: Option<&str>,
    metrics: &Arc<Metrics>,
) -> Result<(), ProxyError> {
    let chunks = mirror.ls_refs_upstream(command, auth).await?;
    metrics.ls_refs_proxied_total.inc();

    // The authoritative advertisement doubles as a staleness probe: any
    // reference we don't hold at the advertised hash queues a background
    // refresh. The client response is not blocked on it.
    let refs = parse_ls_refs_advertisement(&chunks)?;
    if mirror.has_any_update(&refs).await? {
        spawn_background_fetch(mirror, auth, metrics);
    }

    out.extend_from_slice(&pktline::encode_pkts(&chunks));
    Ok(())
}

/// Parse an upstream `ls-refs` advertisement into a reference snapshot.
fn parse_ls_refs_advertisement(
    chunks: &[PktLine],
) -> Result<HashMap<String, String>, ProxyError> {
    let mut refs = HashMap::new();
    for chunk in chunks {
        let PktLine::Data(payload) = chunk else {
            continue;
        };
        let line = String::from_utf8_lossy(payload);
        let mut parts = line.split(' ');
        let (Some(oid), Some(name)) = (parts.next(), parts.next()) else {
            return Err(ProxyError::Internal(anyhow!(
                "cannot parse the upstream ls-refs response: got {:?}, want at least 2 components",
                line.trim_end()
            )));
        };
        refs.insert(name.trim().to_string(), oid.trim().to_string());
    }
    Ok(refs)
}

fn spawn_background_fetch(mirror: &Arc<Mirror>, auth: Option<&str>, metrics: &Arc<Metrics>) {
    let mirror = Arc::clone(mirror);
    let auth = auth.map(str::to_owned);
    let metrics = Arc::clone(metrics);
    metrics.upstream_fetch_total.inc();
    tokio::spawn(async move {
        if let Err(err) = mirror.fetch_upstream(auth.as_deref()).await {
            // Already reported through the operation sink; background
            // fetch failures never reach a client.
            metrics.upstream_fetch_errors_total.inc();
            warn!(upstream = %mirror.upstream_url(), error = %err, "background fetch failed");
        }
    });
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

async fn handle_fetch(
    mirror: &Arc<Mirror>,
    command: &CommandRequest,
    out: &mut Vec<u8>,
    auth: Option<&str>,
    check_interval: Duration,
    cancel: &CancellationToken,
    metrics: &Arc<Metrics>,
) -> Result<(), ProxyError> {
    let (want_hashes, want_refs) = parse_fetch_wants(command)?;

    if !mirror.has_all_wants(&want_hashes, &want_refs).await? {
        wait_for_wants(
            mirror,
            &want_hashes,
            &want_refs,
            auth,
            check_interval,
            cancel,
            metrics,
        )
        .await?;
    }

    mirror.serve_local(command, out).await?;
    metrics.local_serve_total.inc();
    Ok(())
}

/// Launch an upstream fetch and block until the wants are materialized, the
/// fetch fails, or the client goes away.
///
/// Satisfaction is re-evaluated at every event: a tick may observe the refs
/// the client needs long before the full fetch finishes, in which case the
/// client is served while the fetch keeps running in the background.
async fn wait_for_wants(
    mirror: &Arc<Mirror>,
    want_hashes: &[String],
    want_refs: &[String],
    auth: Option<&str>,
    check_interval: Duration,
    cancel: &CancellationToken,
    metrics: &Arc<Metrics>,
) -> Result<(), ProxyError> {
    let (done_tx, done_rx) = oneshot::channel();
    {
        let mirror = Arc::clone(mirror);
        let auth = auth.map(str::to_owned);
        metrics.upstream_fetch_total.inc();
        let metrics = Arc::clone(metrics);
        tokio::spawn(async move {
            let result = mirror.fetch_upstream(auth.as_deref()).await;
            if result.is_err() {
                metrics.upstream_fetch_errors_total.inc();
            }
            // The receiver is gone when the client was cancelled or a tick
            // already satisfied the wants; the fetch result is abandoned.
            let _ = done_tx.send(result);
        });
    }

    let mut done_rx = done_rx;
    let mut ticker = tokio::time::interval(check_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick of a fresh interval completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                // The fetch task keeps running and commits its work to the
                // mirror; only this client gives up.
                return Err(ProxyError::Cancelled);
            }
            result = &mut done_rx => {
                let fetch_result = result.unwrap_or_else(|_| {
                    Err(ProxyError::Internal(anyhow!("upstream fetch task vanished")))
                });
                if !mirror.has_all_wants(want_hashes, want_refs).await? {
                    // A failed fetch explains the missing wants. A fetch
                    // that succeeded without producing them means the
                    // upstream does not have them; fall through and let
                    // upload-pack report that to the client.
                    fetch_result?;
                }
                return Ok(());
            }
            _ = ticker.tick() => {
                if mirror.has_all_wants(want_hashes, want_refs).await? {
                    return Ok(());
                }
            }
        }
    }
}

/// Extract `want <hash>` and `want-ref <name>` arguments from a `fetch`
/// command.
fn parse_fetch_wants(command: &CommandRequest) -> Result<(Vec<String>, Vec<String>), ProxyError> {
    let mut hashes = Vec::new();
    let mut refs = Vec::new();
    for argument in command.arguments() {
        let line = String::from_utf8_lossy(argument);
        let line = line.trim_end_matches('\n');
        if let Some(rest) = line.strip_prefix("want ") {
            let hash = rest.trim();
            if hash.is_empty() {
                return Err(ProxyError::BadRequest(
                    "cannot parse the fetch request: want without a hash".to_string(),
                ));
            }
            hashes.push(hash.to_string());
        } else if let Some(rest) = line.strip_prefix("want-ref ") {
            let name = rest.trim();
            if name.is_empty() {
                return Err(ProxyError::BadRequest(
                    "cannot parse the fetch request: want-ref without a name".to_string(),
                ));
            }
            refs.push(name.to_string());
        }
    }
    Ok((hashes, refs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{locate_git_binary, GitRunner};
    use crate::metrics::MetricsRegistry;
    use crate::mirror::urls::local_mirror_path;
    use crate::mirror::MirrorRegistry;
    use crate::ops::NoopOperationLogger;
    use crate::protocol::request::parse_commands;
    use std::path::Path;
    use url::Url;

    fn fetch_command(args: &[&str]) -> CommandRequest {
        let mut body = pktline::encode_pkt_line(b"command=fetch\n");
        body.extend_from_slice(b"0001");
        for arg in args {
            body.extend_from_slice(&pktline::encode_pkt_line(format!("{arg}\n").as_bytes()));
        }
        body.extend_from_slice(b"0000");
        parse_commands(&body).unwrap().remove(0)
    }

    #[test]
    fn extracts_wants_and_want_refs() {
        let command = fetch_command(&[
            "want aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "want-ref refs/heads/main",
            "have cccccccccccccccccccccccccccccccccccccccc",
            "done",
        ]);
        let (hashes, refs) = parse_fetch_wants(&command).unwrap();
        assert_eq!(hashes, ["aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"]);
        assert_eq!(refs, ["refs/heads/main"]);
    }

    #[test]
    fn rejects_empty_want() {
        let command = fetch_command(&["want "]);
        assert!(parse_fetch_wants(&command).is_err());
    }

    #[test]
    fn parses_advertisement_into_snapshot() {
        let chunks = vec![
            PktLine::Data(b"dddddddddddddddddddddddddddddddddddddddd HEAD\n".to_vec()),
            PktLine::Data(
                b"eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee refs/heads/main\n".to_vec(),
            ),
            PktLine::Flush,
        ];
        let refs = parse_ls_refs_advertisement(&chunks).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs["refs/heads/main"],
            "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
        );
    }

    #[test]
    fn advertisement_line_without_a_name_is_an_error() {
        let chunks = vec![PktLine::Data(b"deadbeef\n".to_vec())];
        assert!(parse_ls_refs_advertisement(&chunks).is_err());
    }

    // -- subprocess-backed tests ------------------------------------------

    fn registry(root: &Path) -> Arc<MirrorRegistry> {
        Arc::new(MirrorRegistry::new(
            root.to_path_buf(),
            GitRunner::new(locate_git_binary().unwrap()),
            reqwest::Client::new(),
            Arc::new(NoopOperationLogger),
        ))
    }

    /// Create a repository with one commit at `path`, returning the commit
    /// id.
    fn seed_repository(path: &Path) -> String {
        std::fs::create_dir_all(path).unwrap();
        let run = |args: &[&str]| {
            let output = std::process::Command::new("git")
                .args(args)
                .current_dir(path)
                .output()
                .unwrap();
            assert!(output.status.success(), "git {args:?} failed");
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        };
        run(&["init"]);
        run(&[
            "-c",
            "user.name=test",
            "-c",
            "user.email=test@example.invalid",
            "commit",
            "--allow-empty",
            "-m",
            "seed",
        ]);
        run(&["rev-parse", "HEAD"])
    }

    #[tokio::test]
    async fn satisfied_wants_serve_without_an_upstream_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let url = Url::parse("https://example.invalid/fix/repo.git").unwrap();
        let head = seed_repository(&local_mirror_path(tmp.path(), &url));

        let registry = registry(tmp.path());
        let mirror = registry.get_or_create(&url, None);
        mirror.open().await.unwrap();

        let metrics = MetricsRegistry::new();
        let command = fetch_command(&[&format!("want {head}"), "done"]);
        let mut out = Vec::new();
        handle_command(
            &mirror,
            &command,
            &mut out,
            None,
            Duration::from_secs(1),
            &CancellationToken::new(),
            &metrics.metrics,
        )
        .await
        .unwrap();

        assert!(!out.is_empty());
        // The wants were already present: no upstream fetch was launched.
        assert_eq!(metrics.metrics.upstream_fetch_total.get(), 0);
        assert_eq!(metrics.metrics.local_serve_total.get(), 1);
    }

    #[tokio::test]
    async fn cancellation_is_observed_while_waiting() {
        let tmp = tempfile::tempdir().unwrap();
        let url = Url::parse("https://example.invalid/cold/repo.git").unwrap();
        let registry = registry(tmp.path());
        let mirror = registry.get_or_create(&url, None);
        mirror.open().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let metrics = MetricsRegistry::new();
        let command =
            fetch_command(&["want aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "done"]);
        let mut out = Vec::new();
        let err = handle_command(
            &mirror,
            &command,
            &mut out,
            None,
            Duration::from_secs(1),
            &cancel,
            &metrics.metrics,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProxyError::Cancelled));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn fetch_against_an_unopened_mirror_is_an_internal_error() {
        let tmp = tempfile::tempdir().unwrap();
        let url = Url::parse("https://example.invalid/x/y.git").unwrap();
        let registry = registry(tmp.path());
        let mirror = registry.get_or_create(&url, None);

        // No open(): the local path does not exist yet.
        let command = fetch_command(&["done"]);
        let err = handle_command(
            &mirror,
            &command,
            &mut Vec::new(),
            None,
            Duration::from_secs(1),
            &CancellationToken::new(),
            &MetricsRegistry::new().metrics,
        )
        .await
        .unwrap_err();
        assert_eq!(err.http_status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
