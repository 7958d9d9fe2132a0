//! `std::io::Write` 어댑터
//!
//! [`SinkWriter`]는 `write` 호출 하나를 레코드 하나로 싱크에 넘깁니다.
//! [`BatchSink`]는 `tracing_subscriber::fmt::MakeWriter`를 구현하므로
//! fmt 레이어의 writer로 바로 설치할 수 있습니다.
//!
//! ```ignore
//! let layer = tracing_subscriber::fmt::layer()
//!     .json()
//!     .with_writer(sink.clone());
//! ```
//!
//! fmt 레이어는 UTF-8 텍스트를 넘기므로, 설정된 문자셋이 UTF-8이 아니면
//! 텍스트로 해석한 뒤 그 문자셋으로 다시 인코딩합니다.
//!
//! 싱크 자신의 이벤트도 같은 레이어로 들어옵니다. `write` 처리 중에 같은 스레드에서
//! 발생한 중첩 `write`는 버려지므로 무한 재귀는 일어나지 않습니다.

use std::cell::Cell;
use std::io;

use tracing_subscriber::fmt::MakeWriter;

use crate::encoding::Charset;
use crate::error::SinkError;
use crate::sink::BatchSink;
use crate::transport::Transport;

thread_local! {
    /// 현재 스레드가 `SinkWriter::write` 안에 있는지 여부
    static IN_WRITE: Cell<bool> = const { Cell::new(false) };
}

/// `IN_WRITE` 플래그를 세우고 drop 시 되돌리는 가드
struct WriteGuard;

impl WriteGuard {
    /// 이미 `write` 안이면 `None`을 반환합니다.
    fn enter() -> Option<Self> {
        IN_WRITE.with(|flag| {
            if flag.replace(true) {
                None
            } else {
                Some(WriteGuard)
            }
        })
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        IN_WRITE.with(|flag| flag.set(false));
    }
}

/// 싱크에 레코드를 쓰는 writer
pub struct SinkWriter<T: Transport> {
    sink: BatchSink<T>,
}

impl<T: Transport> SinkWriter<T> {
    /// 싱크를 감싸는 writer를 생성합니다.
    pub fn new(sink: BatchSink<T>) -> Self {
        Self { sink }
    }

    fn append(&self, buf: &[u8]) -> Result<(), SinkError> {
        if self.sink.config().charset == Charset::Utf8 {
            self.sink.append(buf)?;
        } else {
            let text = String::from_utf8_lossy(buf);
            self.sink.append_str(&text)?;
        }
        Ok(())
    }
}

impl<T: Transport> io::Write for SinkWriter<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // 싱크 내부 로그가 같은 writer로 되돌아온 경우
        let Some(_guard) = WriteGuard::enter() else {
            return Ok(buf.len());
        };

        match self.append(buf) {
            // 크기 초과로 버려진 레코드도 소비된 것으로 취급
            Ok(()) => Ok(buf.len()),
            Err(e @ SinkError::Lifecycle { .. }) => {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, e))
            }
            Err(e) => Err(io::Error::other(e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        // 플러시 시점은 싱크의 버퍼/타이머 정책이 결정
        Ok(())
    }
}

impl<'a, T: Transport> MakeWriter<'a> for BatchSink<T> {
    type Writer = SinkWriter<T>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use bytes::Bytes;

    use super::*;
    use crate::config::SinkConfigBuilder;
    use crate::sink::BatchSinkBuilder;
    use crate::transport::mock::MockTransport;

    async fn sink() -> (BatchSink<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        let config = SinkConfigBuilder::new("app-logs").build().unwrap();
        let sink = BatchSinkBuilder::new(config, mock.clone())
            .build()
            .await
            .unwrap();
        (sink, mock)
    }

    #[tokio::test(start_paused = true)]
    async fn each_write_is_one_record() {
        let (sink, mock) = sink().await;
        let mut writer = sink.make_writer();
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(sink.stats().records_appended, 2);
        sink.close().await;
        assert_eq!(mock.payloads(), vec![Bytes::from_static(b"first\nsecond\n")]);
    }

    #[tokio::test(start_paused = true)]
    async fn write_after_close_is_broken_pipe() {
        let (sink, _mock) = sink().await;
        sink.close().await;

        let mut writer = SinkWriter::new(sink.clone());
        let err = writer.write(b"late\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_use_configured_charset() {
        let mock = MockTransport::new();
        let config = SinkConfigBuilder::new("app-logs")
            .encoding("UTF-16LE")
            .build()
            .unwrap();
        let sink = BatchSinkBuilder::new(config, mock.clone())
            .build()
            .await
            .unwrap();

        sink.make_writer().write_all(b"A").unwrap();
        sink.append_str("A").unwrap();
        sink.close().await;

        assert_eq!(mock.payloads(), vec![Bytes::from_static(b"A\0A\0")]);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_utf8_is_replaced_before_reencoding() {
        let mock = MockTransport::new();
        let config = SinkConfigBuilder::new("app-logs")
            .encoding("US-ASCII")
            .build()
            .unwrap();
        let sink = BatchSinkBuilder::new(config, mock.clone())
            .build()
            .await
            .unwrap();

        sink.make_writer().write_all(b"ok\xff\n").unwrap();
        sink.close().await;

        // U+FFFD는 ASCII로 표현할 수 없으므로 '?'
        assert_eq!(mock.payloads(), vec![Bytes::from_static(b"ok?\n")]);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_events_do_not_recurse_into_writer() {
        use tracing_subscriber::layer::SubscriberExt;

        let mock = MockTransport::new();
        let config = SinkConfigBuilder::new("app-logs").build().unwrap();
        let sink = BatchSinkBuilder::new(config, mock.clone())
            .max_record_bytes(64)
            .build()
            .await
            .unwrap();

        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new("trace"))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(sink.clone()),
            );
        tracing::subscriber::with_default(subscriber, || {
            // 64바이트를 넘는 줄은 거부되고, 거부 에러 로그가 다시 writer로 들어옴
            tracing::info!(padding = %"x".repeat(128), "oversized line");
        });
        assert_eq!(sink.stats().records_rejected, 1);

        sink.close().await;
        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new("trace"))
            .with(tracing_subscriber::fmt::layer().with_writer(sink.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("after close");
        });

        assert_eq!(sink.stats().records_rejected, 1);
        assert!(mock.payloads().is_empty());
    }

    #[test]
    fn write_guard_is_released_on_drop() {
        {
            let _outer = WriteGuard::enter().expect("first entry succeeds");
            assert!(WriteGuard::enter().is_none(), "nested entry is refused");
        }
        assert!(WriteGuard::enter().is_some(), "flag reset after drop");
    }

    #[tokio::test(start_paused = true)]
    async fn fmt_layer_writes_through_sink() {
        use tracing_subscriber::layer::SubscriberExt;

        let (sink, mock) = sink().await;
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .without_time()
                .with_target(false)
                .with_writer(sink.clone()),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(user = "alice", "login succeeded");
        });

        sink.close().await;
        let payloads = mock.payloads();
        assert_eq!(payloads.len(), 1);
        let text = String::from_utf8_lossy(&payloads[0]);
        assert!(text.contains("login succeeded"));
        assert!(text.contains("user=\"alice\""));
    }
}
