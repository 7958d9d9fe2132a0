//! 전송 계층 추상화
//!
//! [`Transport`] trait은 플러시된 blob을 외부 대상(스트리밍 수집 서비스 등)으로
//! 보내는 협력자입니다. 싱크는 반환값의 내용을 보지 않고 성공/실패만 확인합니다.
//!
//! # 구조
//!
//! ```text
//! ┌──────────────┐
//! │  BatchSink   │
//! └──────┬───────┘
//!        │
//!        ▼
//!  ┌───────────┐
//!  │ Transport │ (trait)
//!  └───────────┘
//!     │      │
//!     ▼      ▼
//!  ┌──────┐ ┌──────┐
//!  │ File │ │ Mock │
//!  └──────┘ └──────┘
//! ```
//!
//! 재시도 정책은 전적으로 구현체의 몫입니다. 싱크는 레코드 단위 재시도를 하지 않습니다.

pub mod file;

use std::fmt;
use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

pub use file::FileTransport;

/// 전송 호출 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// 호출 후 결과를 기다리지 않는 비동기 전송 (운영 중 플러시)
    Async,
    /// 전달 완료까지 기다리는 동기 전송 (종료 시 마지막 플러시)
    Sync,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async => write!(f, "async"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

/// 대상 스트림 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationStatus {
    /// 레코드를 받을 수 있음
    Active,
    /// 생성 중
    Creating,
    /// 설정 변경 중
    Updating,
    /// 삭제 중
    Deleting,
}

impl fmt::Display for DestinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Creating => write!(f, "creating"),
            Self::Updating => write!(f, "updating"),
            Self::Deleting => write!(f, "deleting"),
        }
    }
}

/// 전송 협력자 trait
///
/// 구현체는 하나의 대상 스트림에 묶입니다.
///
/// # 구현체
///
/// - [`FileTransport`]: 로컬 파일에 blob을 이어 쓰는 구현
/// - `MockTransport`: 호출을 기록하는 테스트용 구현 (테스트에서만 사용 가능)
pub trait Transport: Send + Sync + 'static {
    /// 대상 스트림의 현재 상태를 조회합니다.
    ///
    /// # Errors
    ///
    /// 대상이 존재하지 않거나 조회할 수 없으면 에러를 반환합니다.
    fn status(&self) -> impl Future<Output = Result<DestinationStatus, TransportError>> + Send;

    /// blob 하나를 대상으로 보냅니다.
    fn dispatch(
        &self,
        payload: Bytes,
        mode: DispatchMode,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// 전송 자원을 해제합니다. 싱크의 마지막 플러시가 끝난 뒤 한 번 호출됩니다.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct Calls {
        fail_dispatch: AtomicBool,
        dispatched: Mutex<Vec<(Bytes, DispatchMode)>>,
        shutdowns: AtomicUsize,
    }

    /// 호출을 기록하는 테스트용 전송 구현
    ///
    /// 복제본은 같은 기록을 공유하므로 싱크에 넘긴 뒤에도 검사할 수 있습니다.
    #[derive(Clone)]
    pub(crate) struct MockTransport {
        status: Result<DestinationStatus, String>,
        calls: Arc<Calls>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::with_status(Ok(DestinationStatus::Active))
        }

        pub(crate) fn with_status(status: Result<DestinationStatus, String>) -> Self {
            Self {
                status,
                calls: Arc::new(Calls::default()),
            }
        }

        pub(crate) fn set_fail_dispatch(&self, fail: bool) {
            self.calls.fail_dispatch.store(fail, Ordering::SeqCst);
        }

        pub(crate) fn dispatched(&self) -> Vec<(Bytes, DispatchMode)> {
            self.calls.dispatched.lock().unwrap().clone()
        }

        pub(crate) fn payloads(&self) -> Vec<Bytes> {
            self.dispatched().into_iter().map(|(b, _)| b).collect()
        }

        pub(crate) fn shutdowns(&self) -> usize {
            self.calls.shutdowns.load(Ordering::SeqCst)
        }
    }

    impl Transport for MockTransport {
        async fn status(&self) -> Result<DestinationStatus, TransportError> {
            self.status.clone().map_err(TransportError::Unavailable)
        }

        async fn dispatch(&self, payload: Bytes, mode: DispatchMode) -> Result<(), TransportError> {
            if self.calls.fail_dispatch.load(Ordering::SeqCst) {
                return Err(TransportError::Rejected("mock failure".to_owned()));
            }
            self.calls.dispatched.lock().unwrap().push((payload, mode));
            Ok(())
        }

        async fn shutdown(&self) {
            self.calls.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}
