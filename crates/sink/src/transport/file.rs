//! 파일 전송 구현
//!
//! 각 blob을 `{root_dir}/{region}/{destination}.log`에 이어 씁니다.
//! 로컬 개발이나 수집 서비스 없이 싱크 동작을 확인할 때 사용합니다.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use logfunnel_core::config::TransportSection;

use crate::config::SinkConfig;
use crate::error::TransportError;

use super::{DestinationStatus, DispatchMode, Transport};

/// 백오프 지수 상한 (base * 2^10)
const MAX_BACKOFF_SHIFT: u32 = 10;

/// 로컬 파일 전송
pub struct FileTransport {
    region_dir: PathBuf,
    path: PathBuf,
    max_retries: u32,
    backoff_base: Duration,
    write_lock: tokio::sync::Mutex<()>,
    shut_down: AtomicBool,
}

impl FileTransport {
    /// 새 파일 전송을 생성합니다. 파일은 첫 전송 시점에 만들어집니다.
    pub fn new(
        root_dir: impl AsRef<Path>,
        region: &str,
        destination: &str,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Self {
        let region_dir = root_dir.as_ref().join(region);
        let path = region_dir.join(format!("{destination}.log"));
        Self {
            region_dir,
            path,
            max_retries,
            backoff_base,
            write_lock: tokio::sync::Mutex::new(()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// `[transport]` 섹션과 싱크 설정으로 생성합니다.
    pub fn from_config(transport: &TransportSection, sink: &SinkConfig) -> Self {
        Self::new(
            &transport.root_dir,
            &sink.region,
            &sink.destination,
            sink.max_retries,
            Duration::from_millis(transport.retry_backoff_base_ms),
        )
    }

    /// 출력 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_SHIFT))
    }

    async fn write_once(&self, payload: &[u8], mode: DispatchMode) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(payload).await?;
        file.flush().await?;
        if mode == DispatchMode::Sync {
            file.sync_data().await?;
        }
        Ok(())
    }
}

impl Transport for FileTransport {
    async fn status(&self) -> Result<DestinationStatus, TransportError> {
        tokio::fs::create_dir_all(&self.region_dir).await?;
        if tokio::fs::metadata(&self.path)
            .await
            .is_ok_and(|meta| meta.is_dir())
        {
            return Err(TransportError::Unavailable(format!(
                "{} is a directory",
                self.path.display()
            )));
        }
        Ok(DestinationStatus::Active)
    }

    async fn dispatch(&self, payload: Bytes, mode: DispatchMode) -> Result<(), TransportError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Unavailable(
                "transport has been shut down".to_owned(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.write_once(&payload, mode).await {
                Ok(()) => {
                    debug!(
                        path = %self.path.display(),
                        bytes = payload.len(),
                        mode = %mode,
                        attempt,
                        "blob written"
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    let backoff = self.backoff(attempt);
                    warn!(
                        path = %self.path.display(),
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "file write failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        debug!(path = %self.path.display(), "file transport shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(root: &Path, retries: u32) -> FileTransport {
        FileTransport::new(root, "local-1", "orders", retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn status_creates_region_dir() {
        let dir = tempfile::tempdir().unwrap();
        let t = transport(dir.path(), 0);
        assert_eq!(t.status().await.unwrap(), DestinationStatus::Active);
        assert!(dir.path().join("local-1").is_dir());
    }

    #[tokio::test]
    async fn status_fails_when_destination_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("local-1").join("orders.log")).unwrap();
        let t = transport(dir.path(), 0);
        assert!(matches!(
            t.status().await,
            Err(TransportError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn dispatch_appends_blobs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let t = transport(dir.path(), 0);
        t.status().await.unwrap();

        t.dispatch(Bytes::from_static(b"first\n"), DispatchMode::Async)
            .await
            .unwrap();
        t.dispatch(Bytes::from_static(b"second\n"), DispatchMode::Sync)
            .await
            .unwrap();

        let content = std::fs::read_to_string(t.path()).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[tokio::test]
    async fn dispatch_gives_up_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        // 쓰기 대상 경로를 디렉터리로 막아 open이 계속 실패하도록 함
        std::fs::create_dir_all(dir.path().join("local-1").join("orders.log")).unwrap();
        let t = transport(dir.path(), 2);

        let err = t
            .dispatch(Bytes::from_static(b"x"), DispatchMode::Async)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[tokio::test]
    async fn dispatch_after_shutdown_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let t = transport(dir.path(), 0);
        t.status().await.unwrap();
        t.shutdown().await;

        let err = t
            .dispatch(Bytes::from_static(b"late"), DispatchMode::Sync)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert!(!t.path().exists());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let t = FileTransport::new("/tmp", "r", "d", 3, Duration::from_millis(100));
        assert_eq!(t.backoff(0), Duration::from_millis(100));
        assert_eq!(t.backoff(1), Duration::from_millis(200));
        assert_eq!(t.backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn from_config_uses_region_and_destination() {
        let section = TransportSection {
            root_dir: "/data/streams".to_owned(),
            ..Default::default()
        };
        let sink = crate::config::SinkConfigBuilder::new("orders")
            .region("eu-west-1")
            .build()
            .unwrap();
        let t = FileTransport::from_config(&section, &sink);
        assert_eq!(t.path(), Path::new("/data/streams/eu-west-1/orders.log"));
    }
}
