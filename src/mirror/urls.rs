//! Upstream URL canonicalization and cache path derivation.
//!
//! A mirror's identity is its canonical upstream URL: scheme forced to
//! `https`, host preserved, the Git endpoint suffix stripped, and query,
//! fragment and userinfo discarded. Its on-disk location is derived from the
//! configured cache root, the host, and the path with both the endpoint
//! suffixes and `.git` removed.

use std::path::{Path, PathBuf};

use url::Url;

const ENDPOINT_SUFFIXES: [&str; 3] = ["/info/refs", "/git-receive-pack", "/git-upload-pack"];

/// Canonicalize a request URL into the mirror's upstream identity.
pub fn canonical_upstream_url(raw: &Url) -> Url {
    let mut url = raw.clone();
    // `http` and `https` are both special schemes, so this cannot fail.
    let _ = url.set_scheme("https");
    url.set_query(None);
    url.set_fragment(None);
    let _ = url.set_username("");
    let _ = url.set_password(None);

    let path = url.path().to_string();
    for suffix in ENDPOINT_SUFFIXES {
        if let Some(stripped) = path.strip_suffix(suffix) {
            url.set_path(stripped);
            break;
        }
    }
    url
}

/// Remove every occurrence of the Git endpoint suffixes and `.git`.
///
/// Applying this twice yields the same result as applying it once, which
/// keeps cache paths stable no matter which endpoint URL introduced the
/// repository.
pub fn strip_git_suffixes(path: &str) -> String {
    let mut out = path.to_string();
    for pattern in ["/info/refs", "/git-receive-pack", "/git-upload-pack", ".git"] {
        out = out.replace(pattern, "");
    }
    out
}

/// The on-disk location of the mirror for `url`:
/// `<cache_root>/<host>/<stripped path>`.
pub fn local_mirror_path(cache_root: &Path, url: &Url) -> PathBuf {
    let mut host = url.host_str().unwrap_or_default().to_string();
    if let Some(port) = url.port() {
        host.push_str(&format!(":{port}"));
    }
    let stripped = strip_git_suffixes(url.path());
    cache_root.join(host).join(stripped.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forces_https_and_drops_noise() {
        let raw =
            Url::parse("http://user:pw@example.invalid/org/repo.git/info/refs?service=git-upload-pack#frag")
                .unwrap();
        let canonical = canonical_upstream_url(&raw);
        assert_eq!(canonical.as_str(), "https://example.invalid/org/repo.git");
    }

    #[test]
    fn canonical_strips_upload_pack_suffix() {
        let raw = Url::parse("https://example.invalid/org/repo.git/git-upload-pack").unwrap();
        assert_eq!(
            canonical_upstream_url(&raw).as_str(),
            "https://example.invalid/org/repo.git"
        );
    }

    #[test]
    fn canonical_strips_receive_pack_suffix() {
        let raw = Url::parse("https://example.invalid/org/repo/git-receive-pack").unwrap();
        assert_eq!(
            canonical_upstream_url(&raw).as_str(),
            "https://example.invalid/org/repo"
        );
    }

    #[test]
    fn canonical_without_suffix_is_untouched() {
        let raw = Url::parse("https://example.invalid/org/repo.git").unwrap();
        assert_eq!(canonical_upstream_url(&raw).as_str(), raw.as_str());
    }

    #[test]
    fn strip_is_idempotent() {
        let inputs = [
            "/org/repo.git/info/refs",
            "/org/repo.git/git-upload-pack",
            "/org/repo/git-receive-pack",
            "/org/repo.git",
            "/org/repo",
        ];
        for input in inputs {
            let once = strip_git_suffixes(input);
            let twice = strip_git_suffixes(&once);
            assert_eq!(once, twice, "strip not idempotent for {input}");
        }
    }

    #[test]
    fn local_path_layout() {
        let url = Url::parse("https://example.invalid/org/repo.git/info/refs").unwrap();
        let path = local_mirror_path(Path::new("/var/cache/mirrors"), &url);
        assert_eq!(
            path,
            PathBuf::from("/var/cache/mirrors/example.invalid/org/repo")
        );
    }

    #[test]
    fn local_path_keeps_explicit_port() {
        let url = Url::parse("https://example.invalid:8443/org/repo.git").unwrap();
        let path = local_mirror_path(Path::new("/cache"), &url);
        assert_eq!(path, PathBuf::from("/cache/example.invalid:8443/org/repo"));
    }

    #[test]
    fn same_path_for_every_endpoint_url() {
        let root = Path::new("/cache");
        let variants = [
            "https://example.invalid/org/repo.git/info/refs",
            "https://example.invalid/org/repo.git/git-upload-pack",
            "https://example.invalid/org/repo.git/git-receive-pack",
            "https://example.invalid/org/repo.git",
        ];
        let paths: Vec<_> = variants
            .iter()
            .map(|v| local_mirror_path(root, &Url::parse(v).unwrap()))
            .collect();
        assert!(paths.windows(2).all(|w| w[0] == w[1]));
    }
}
