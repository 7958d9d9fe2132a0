//! 에러 타입 -- 도메인별 에러 정의

/// logfunnel 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogfunnelError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 싱크 처리 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkFailure),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 싱크 크레이트에서 올라온 에러
///
/// 상위 레이어는 싱크 내부 에러 타입에 의존하지 않고 이 타입으로 받습니다.
#[derive(Debug, thiserror::Error)]
pub enum SinkFailure {
    /// 싱크 생성 실패 (설정 오류, 대상 스트림 미준비 등)
    #[error("sink init failed: {0}")]
    InitFailed(String),

    /// 이미 닫힌 싱크에 대한 호출
    #[error("sink closed: {0}")]
    Closed(String),

    /// 전송 실패
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_contains_field() {
        let err = ConfigError::InvalidValue {
            field: "sink.destination".to_owned(),
            reason: "must not be blank".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sink.destination"));
        assert!(msg.contains("must not be blank"));
    }

    #[test]
    fn sink_failure_converts_to_top_level() {
        let err: LogfunnelError = SinkFailure::Closed("draining".to_owned()).into();
        assert!(matches!(err, LogfunnelError::Sink(SinkFailure::Closed(_))));
        assert!(err.to_string().contains("draining"));
    }
}
