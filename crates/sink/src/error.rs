//! 싱크 에러 타입
//!
//! [`SinkError`]는 배치 싱크에서 발생하는 모든 에러를 표현합니다.
//! 생성 시점 에러([`SinkError::Config`], [`SinkError::DestinationNotReady`])만 호출자에게
//! 치명적이며, 운영 중 에러(크기 초과, 전송 실패)는 싱크 내부에서 로그로 보고되고 흡수됩니다.
//!
//! `From<SinkError> for LogfunnelError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logfunnel_core::error::{LogfunnelError, SinkFailure};

use crate::sink::SinkState;

/// 배치 싱크 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 설정 에러 (필수값 누락, 런타임 없음 등)
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 대상 스트림이 활성 상태가 아니거나 존재하지 않음
    #[error("destination '{destination}' is not ready for sink '{sink}': {reason}")]
    DestinationNotReady {
        /// 싱크 이름
        sink: String,
        /// 대상 스트림 이름
        destination: String,
        /// 사유
        reason: String,
    },

    /// 단일 레코드가 허용 최대 크기를 초과
    #[error("record of {size} bytes exceeds the {max} byte limit")]
    OversizeRecord {
        /// 레코드 크기 (바이트)
        size: usize,
        /// 허용 최대 크기 (바이트)
        max: usize,
    },

    /// 닫혔거나 닫히는 중인 싱크에 대한 호출
    #[error("sink is {state}, no further records are accepted")]
    Lifecycle {
        /// 호출 시점의 싱크 상태
        state: SinkState,
    },

}

/// 전송 계층 에러
///
/// [`Transport`](crate::transport::Transport) 구현이 반환합니다.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 대상이 요청을 거부함
    #[error("rejected by destination: {0}")]
    Rejected(String),

    /// 대상에 접근할 수 없음
    #[error("destination unavailable: {0}")]
    Unavailable(String),
}

impl From<SinkError> for LogfunnelError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Lifecycle { .. } => {
                LogfunnelError::Sink(SinkFailure::Closed(err.to_string()))
            }
            SinkError::OversizeRecord { .. } => {
                LogfunnelError::Sink(SinkFailure::Dispatch(err.to_string()))
            }
            SinkError::Config { .. } | SinkError::DestinationNotReady { .. } => {
                LogfunnelError::Sink(SinkFailure::InitFailed(err.to_string()))
            }
        }
    }
}
