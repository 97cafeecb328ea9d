//! Directory listing that survives unresolvable refs.
//!
//! Models routinely invent branch names. Instead of failing the whole tool
//! call, [`SafeDirectoryListing`] retries once against the default branch
//! when the listing fails with [`GithubError::InvalidRef`].

use crate::github::client::GithubClient;
use crate::github::error::{GithubError, GithubResult};
use crate::github::types::{DirectoryEntry, RawContent};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// The two listing primitives the fallback needs.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// List `path` at `git_ref`, passing the ref through unchanged.
    async fn list_directory(
        &self,
        repo_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GithubResult<Vec<DirectoryEntry>>;

    /// List `path` on the default branch, unshaped.
    async fn list_raw(&self, repo_name: &str, path: &str) -> GithubResult<Vec<RawContent>>;
}

#[async_trait]
impl DirectoryLister for GithubClient {
    async fn list_directory(
        &self,
        repo_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GithubResult<Vec<DirectoryEntry>> {
        self.get_directory_content(repo_name, path, git_ref).await
    }

    async fn list_raw(&self, repo_name: &str, path: &str) -> GithubResult<Vec<RawContent>> {
        self.get_raw_directory(repo_name, path).await
    }
}

/// Wraps a [`DirectoryLister`] with a single ref-less retry.
#[derive(Clone)]
pub struct SafeDirectoryListing {
    inner: Arc<dyn DirectoryLister>,
}

impl SafeDirectoryListing {
    pub fn new(inner: Arc<dyn DirectoryLister>) -> Self {
        Self { inner }
    }

    /// List a directory, falling back to the default branch on a bad ref.
    ///
    /// Only `InvalidRef` triggers the retry; every other error, and any
    /// error from the retry itself, is returned unchanged.
    pub async fn get_directory_content(
        &self,
        repo_name: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> GithubResult<Vec<DirectoryEntry>> {
        match self.inner.list_directory(repo_name, path, git_ref).await {
            Err(GithubError::InvalidRef(bad_ref)) => {
                warn!(
                    "Invalid ref '{}' in get_directory_content for {}, path='{}'. Retrying without ref.",
                    bad_ref, repo_name, path
                );
                let raw = self.inner.list_raw(repo_name, path).await?;
                Ok(raw.iter().map(DirectoryEntry::from_raw).collect())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::EntryKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted lister recording every call it receives.
    struct FakeLister {
        primary: Mutex<Option<GithubResult<Vec<DirectoryEntry>>>>,
        raw: Mutex<Option<GithubResult<Vec<RawContent>>>>,
        refs_seen: Mutex<Vec<Option<String>>>,
        raw_calls: AtomicUsize,
    }

    impl FakeLister {
        fn new(
            primary: GithubResult<Vec<DirectoryEntry>>,
            raw: GithubResult<Vec<RawContent>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                primary: Mutex::new(Some(primary)),
                raw: Mutex::new(Some(raw)),
                refs_seen: Mutex::new(Vec::new()),
                raw_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DirectoryLister for FakeLister {
        async fn list_directory(
            &self,
            _repo_name: &str,
            _path: &str,
            git_ref: Option<&str>,
        ) -> GithubResult<Vec<DirectoryEntry>> {
            self.refs_seen.lock().unwrap().push(git_ref.map(String::from));
            self.primary.lock().unwrap().take().expect("primary called twice")
        }

        async fn list_raw(&self, _repo_name: &str, _path: &str) -> GithubResult<Vec<RawContent>> {
            self.raw_calls.fetch_add(1, Ordering::SeqCst);
            self.raw.lock().unwrap().take().expect("raw called twice")
        }
    }

    /// Collects formatted warnings for the current thread.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn warnings(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .filter(|l| l.contains("WARN"))
                .map(str::to_string)
                .collect()
        }
    }

    fn capture_warnings() -> (tracing::subscriber::DefaultGuard, LogBuffer) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (tracing::subscriber::set_default(subscriber), buffer)
    }

    fn raw_item(name: &str, kind: &str, size: u64) -> RawContent {
        RawContent {
            name: name.to_string(),
            path: format!("workflows/{}", name),
            kind: kind.to_string(),
            size,
            sha: None,
            html_url: Some(format!("https://github.com/o/r/tree/main/workflows/{}", name)),
            content: None,
            encoding: None,
        }
    }

    #[tokio::test]
    async fn test_primary_path_passes_ref_through() {
        let entries = vec![DirectoryEntry::from_raw(&raw_item("ci.yml", "file", 10))];
        let fake = FakeLister::new(Ok(entries.clone()), Ok(vec![]));
        let listing = SafeDirectoryListing::new(fake.clone());

        let result = listing
            .get_directory_content("o/r", "workflows", Some("main"))
            .await
            .unwrap();

        assert_eq!(result, entries);
        assert_eq!(*fake.refs_seen.lock().unwrap(), vec![Some("main".to_string())]);
        assert_eq!(fake.raw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_ref_falls_back_to_default_branch() {
        let fake = FakeLister::new(
            Err(GithubError::InvalidRef("not-a-branch".into())),
            Ok(vec![raw_item("ci.yml", "file", 321), raw_item("scripts", "dir", 4096)]),
        );
        let listing = SafeDirectoryListing::new(fake.clone());

        let result = listing
            .get_directory_content("o/r", "workflows", Some("not-a-branch"))
            .await
            .unwrap();

        assert_eq!(fake.raw_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "ci.yml");
        assert_eq!(result[0].kind, EntryKind::File);
        assert_eq!(result[0].size, 321);
        assert_eq!(result[1].kind, EntryKind::Dir);
        assert_eq!(result[1].size, 0);
        assert_eq!(
            result[1].url,
            "https://github.com/o/r/tree/main/workflows/scripts"
        );
    }

    #[tokio::test]
    async fn test_other_errors_propagate_without_retry() {
        let fake = FakeLister::new(
            Err(GithubError::NotFound("Not Found".into())),
            Ok(vec![raw_item("ci.yml", "file", 1)]),
        );
        let listing = SafeDirectoryListing::new(fake.clone());

        let err = listing
            .get_directory_content("o/r", "missing", Some("main"))
            .await
            .unwrap_err();

        assert!(matches!(err, GithubError::NotFound(_)));
        assert_eq!(fake.raw_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_logs_one_warning() {
        let (_guard, logs) = capture_warnings();
        let fake = FakeLister::new(
            Err(GithubError::InvalidRef("not-a-branch".into())),
            Ok(vec![raw_item("ci.yml", "file", 1)]),
        );
        let listing = SafeDirectoryListing::new(fake.clone());

        listing
            .get_directory_content("agno-agi/agno", "workflows", Some("not-a-branch"))
            .await
            .unwrap();

        let warnings = logs.warnings();
        assert_eq!(warnings.len(), 1, "{:?}", warnings);
        assert!(warnings[0].contains("agno-agi/agno"));
        assert!(warnings[0].contains("path='workflows'"));
        assert!(warnings[0].contains("not-a-branch"));
    }

    #[tokio::test]
    async fn test_no_warning_without_fallback() {
        let (_guard, logs) = capture_warnings();
        let fake = FakeLister::new(
            Err(GithubError::NotFound("Not Found".into())),
            Ok(vec![]),
        );
        let listing = SafeDirectoryListing::new(fake.clone());

        let _ = listing
            .get_directory_content("agno-agi/agno", "missing", Some("main"))
            .await;

        assert!(logs.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_failure_propagates() {
        let fake = FakeLister::new(
            Err(GithubError::InvalidRef("x..y".into())),
            Err(GithubError::RateLimited { reset: None }),
        );
        let listing = SafeDirectoryListing::new(fake.clone());

        let err = listing
            .get_directory_content("o/r", "workflows", Some("x..y"))
            .await
            .unwrap_err();

        assert!(matches!(err, GithubError::RateLimited { .. }));
        assert_eq!(fake.raw_calls.load(Ordering::SeqCst), 1);
    }
}
