//! Test support: one-time logging setup and fake I/O boundaries

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::infrastructure::traits::{FileSystem, HttpClient, TransportError};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // RUST_LOG wins, otherwise keep the crate chatty and dependencies quiet
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,mable=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// HTTP fake answering every GET with the same canned result and counting calls.
#[derive(Debug)]
pub struct StaticHttpClient {
    body: Result<String, u16>,
    calls: AtomicUsize,
}

impl StaticHttpClient {
    /// Answer with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            body: Ok(body.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer with HTTP `status`.
    pub fn status(status: u16) -> Self {
        Self {
            body: Err(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpClient for StaticHttpClient {
    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.body {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(TransportError::Status {
                url: url.to_string(),
                status: *status,
            }),
        }
    }
}

/// In-memory filesystem recording every write.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    writes: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.lock().insert(path.into(), content.into());
        fs
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn content(&self, path: &Path) -> Option<String> {
        self.lock().get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.lock().insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
        init_test_setup();
    }

    #[test]
    fn given_memory_fs_when_reading_missing_file_then_not_found() {
        let fs = MemoryFileSystem::default();
        let err = fs.read_to_string(Path::new("missing.json")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn given_failing_http_when_getting_then_counts_the_call() {
        let http = StaticHttpClient::status(503);
        assert!(http.get("http://abl").is_err());
        assert_eq!(http.calls(), 1);
    }
}
