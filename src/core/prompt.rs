//! Prompt-audio resolution.
//!
//! A request references its voice prompt in one of three ways: bytes uploaded
//! with the request, a path on the local filesystem, or a remote URL. All
//! three funnel through [`PromptStore::resolve`], which lands the audio in
//! the managed input directory under a freshly generated name. Source files
//! are never touched; every request writes its own uniquely named copy, so
//! concurrent requests cannot collide.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::config::ensure_dir;

/// Bound on the remote prompt fetch; the only timeout in the request path.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback extension when the source carries none
const DEFAULT_EXT: &str = ".wav";

pub type PromptResult<T> = Result<T, PromptError>;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt audio not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to fetch prompt audio: {0}")]
    UpstreamFetch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where a request's reference voice recording comes from
#[derive(Debug, Clone)]
pub enum PromptSource {
    /// Raw bytes uploaded with the request, with the client-supplied filename
    /// if any (used only for its extension)
    Upload {
        data: Bytes,
        filename: Option<String>,
    },
    /// Path on this machine's filesystem
    LocalPath(String),
    /// HTTP(S) URL to fetch
    RemoteUrl(String),
}

impl PromptSource {
    /// Classify a caller-supplied string as URL or local path.
    ///
    /// The tool adapter accepts both through a single `prompt_wav_path`
    /// argument; the HTTP adapter does not use this and treats the field
    /// strictly as a local path.
    pub fn from_path_or_url(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            PromptSource::RemoteUrl(value.to_string())
        } else {
            PromptSource::LocalPath(value.to_string())
        }
    }
}

/// Resolver that lands prompt audio in the managed input directory
#[derive(Clone)]
pub struct PromptStore {
    input_dir: PathBuf,
    client: reqwest::Client,
}

impl PromptStore {
    pub fn new(input_dir: PathBuf) -> Self {
        Self::with_timeout(input_dir, FETCH_TIMEOUT)
    }

    fn with_timeout(input_dir: PathBuf, timeout: Duration) -> Self {
        // Client construction only fails when the TLS backend cannot
        // initialize, in which case no fetch could succeed anyway; a client
        // without the timeout bound is not an acceptable substitute.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to construct HTTP client");
        Self { input_dir, client }
    }

    /// Resolve a prompt source into a file under the input directory.
    ///
    /// The returned path always exists when this returns `Ok`.
    pub async fn resolve(&self, source: PromptSource) -> PromptResult<PathBuf> {
        ensure_dir(&self.input_dir)?;
        match source {
            PromptSource::Upload { data, filename } => {
                let ext = extension_of(filename.as_deref().unwrap_or(""));
                let dst = self.generate_path(ext);
                std::fs::write(&dst, &data)?;
                debug!(path = %dst.display(), bytes = data.len(), "stored uploaded prompt");
                Ok(dst)
            }
            PromptSource::LocalPath(path) => {
                let abs = std::path::absolute(Path::new(&path))?;
                if !abs.exists() {
                    return Err(PromptError::NotFound(abs));
                }
                let ext = extension_of(&path);
                let dst = self.generate_path(ext);
                // Copy, never move: the caller's file stays untouched.
                std::fs::copy(&abs, &dst)?;
                debug!(src = %abs.display(), path = %dst.display(), "copied local prompt");
                Ok(dst)
            }
            PromptSource::RemoteUrl(url) => {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| PromptError::UpstreamFetch(format!("GET {url}: {e}")))?;
                if !response.status().is_success() {
                    return Err(PromptError::UpstreamFetch(format!(
                        "GET {url}: status {}",
                        response.status()
                    )));
                }
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| PromptError::UpstreamFetch(format!("GET {url}: {e}")))?;
                let dst = self.generate_path(url_extension(&url));
                std::fs::write(&dst, &body)?;
                debug!(url, path = %dst.display(), bytes = body.len(), "downloaded remote prompt");
                Ok(dst)
            }
        }
    }

    /// Fresh `{uuid}{ext}` path inside the input directory
    fn generate_path(&self, ext: &str) -> PathBuf {
        self.input_dir
            .join(format!("{}{ext}", Uuid::new_v4().simple()))
    }
}

/// Extension of a filename or path including the leading dot, or the `.wav`
/// default when there is none.
fn extension_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && !ext.contains('/') => {
            &name[name.len() - ext.len() - 1..]
        }
        _ => DEFAULT_EXT,
    }
}

/// Extension derived from a URL path, ignoring the query string.
fn url_extension(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    extension_of(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_preserved_or_defaulted() {
        assert_eq!(extension_of("voice.mp3"), ".mp3");
        assert_eq!(extension_of("dir/voice.ogg"), ".ogg");
        assert_eq!(extension_of("noext"), ".wav");
        assert_eq!(extension_of(""), ".wav");
        // A dot that belongs to a directory, not the filename
        assert_eq!(extension_of("some.dir/noext"), ".wav");
    }

    #[test]
    fn url_extension_strips_query() {
        assert_eq!(url_extension("https://host/a/voice.mp3?sig=abc"), ".mp3");
        assert_eq!(url_extension("https://host/a/voice"), ".wav");
    }

    #[tokio::test]
    async fn upload_lands_in_input_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PromptStore::new(tmp.path().join("in"));
        let path = store
            .resolve(PromptSource::Upload {
                data: Bytes::from_static(b"fake audio"),
                filename: Some("sample.mp3".to_string()),
            })
            .await
            .unwrap();
        assert!(path.exists());
        assert!(path.starts_with(tmp.path().join("in")));
        assert_eq!(path.extension().unwrap(), "mp3");
        assert_eq!(std::fs::read(&path).unwrap(), b"fake audio");
    }

    #[tokio::test]
    async fn local_path_is_copied_not_moved() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("source.wav");
        std::fs::write(&src, b"pcm").unwrap();

        let store = PromptStore::new(tmp.path().join("in"));
        let path = store
            .resolve(PromptSource::LocalPath(src.display().to_string()))
            .await
            .unwrap();

        assert!(src.exists(), "source must remain untouched");
        assert!(path.exists());
        assert_ne!(path, src);
        assert_eq!(std::fs::read(&path).unwrap(), b"pcm");
    }

    #[tokio::test]
    async fn missing_local_path_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let input_dir = tmp.path().join("in");
        let store = PromptStore::new(input_dir.clone());

        let err = store
            .resolve(PromptSource::LocalPath(
                tmp.path().join("absent.wav").display().to_string(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::NotFound(_)));

        let written: Vec<_> = std::fs::read_dir(&input_dir).unwrap().collect();
        assert!(written.is_empty(), "input dir must stay empty on failure");
    }

    #[tokio::test]
    async fn distinct_uploads_never_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PromptStore::new(tmp.path().join("in"));

        let a = store.resolve(PromptSource::Upload {
            data: Bytes::from_static(b"voice a"),
            filename: None,
        });
        let b = store.resolve(PromptSource::Upload {
            data: Bytes::from_static(b"voice b"),
            filename: None,
        });
        let (a, b) = tokio::join!(a, b);
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), b"voice a");
        assert_eq!(std::fs::read(&b).unwrap(), b"voice b");
    }

    #[tokio::test]
    async fn slow_remote_fetch_times_out() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/voice.wav"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"pcm".to_vec())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&upstream)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let store = PromptStore::with_timeout(tmp.path().join("in"), Duration::from_millis(50));
        let err = store
            .resolve(PromptSource::RemoteUrl(format!(
                "{}/voice.wav",
                upstream.uri()
            )))
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::UpstreamFetch(_)));
    }

    #[test]
    fn path_or_url_classification() {
        assert!(matches!(
            PromptSource::from_path_or_url("https://host/voice.wav"),
            PromptSource::RemoteUrl(_)
        ));
        assert!(matches!(
            PromptSource::from_path_or_url("http://host/voice.wav"),
            PromptSource::RemoteUrl(_)
        ));
        assert!(matches!(
            PromptSource::from_path_or_url("/data/voice.wav"),
            PromptSource::LocalPath(_)
        ));
    }
}
