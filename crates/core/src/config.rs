//! 설정 관리 -- logfunnel.toml 파싱 및 런타임 설정
//!
//! [`LogfunnelConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGFUNNEL_SINK_DESTINATION=app-logs` 형식)
//! 3. 설정 파일 (`logfunnel.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! `[sink]` 섹션의 값은 사용자가 적은 그대로 보관합니다.
//! 기본값 대체와 범위 보정(clamp)은 싱크 크레이트의 `SinkConfig::from_core`가 담당합니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logfunnel_core::error::LogfunnelError> {
//! use logfunnel_core::config::LogfunnelConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogfunnelConfig::load("logfunnel.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogfunnelConfig::parse("[sink]\ndestination = \"app-logs\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogfunnelError};

/// logfunnel 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogfunnelConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 배치 싱크 설정
    #[serde(default)]
    pub sink: SinkSection,
    /// 전송 계층 설정
    #[serde(default)]
    pub transport: TransportSection,
}

impl LogfunnelConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogfunnelError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogfunnelError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogfunnelError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogfunnelError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogfunnelError> {
        toml::from_str(toml_str).map_err(|e| {
            LogfunnelError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGFUNNEL_{SECTION}_{FIELD}`
    /// 예: `LOGFUNNEL_SINK_BUFFER_SIZE_KB=500`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGFUNNEL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGFUNNEL_GENERAL_LOG_FORMAT");

        // Sink
        override_string(&mut self.sink.name, "LOGFUNNEL_SINK_NAME");
        override_string(&mut self.sink.destination, "LOGFUNNEL_SINK_DESTINATION");
        override_string(&mut self.sink.encoding, "LOGFUNNEL_SINK_ENCODING");
        override_u32(&mut self.sink.max_retries, "LOGFUNNEL_SINK_MAX_RETRIES");
        override_string(&mut self.sink.region, "LOGFUNNEL_SINK_REGION");
        override_i64(
            &mut self.sink.buffer_size_kb,
            "LOGFUNNEL_SINK_BUFFER_SIZE_KB",
        );
        override_i64(
            &mut self.sink.max_put_record_delay_mins,
            "LOGFUNNEL_SINK_MAX_PUT_RECORD_DELAY_MINS",
        );
        override_usize(
            &mut self.sink.dispatch_queue_capacity,
            "LOGFUNNEL_SINK_DISPATCH_QUEUE_CAPACITY",
        );

        // Transport
        override_string(&mut self.transport.kind, "LOGFUNNEL_TRANSPORT_KIND");
        override_string(&mut self.transport.root_dir, "LOGFUNNEL_TRANSPORT_ROOT_DIR");
        override_u64(
            &mut self.transport.retry_backoff_base_ms,
            "LOGFUNNEL_TRANSPORT_RETRY_BACKOFF_BASE_MS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// `sink.destination`은 여기서 검사하지 않습니다.
    /// 싱크를 실제로 생성하는 시점에 필수값으로 검증됩니다.
    pub fn validate(&self) -> Result<(), LogfunnelError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.sink.dispatch_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sink.dispatch_queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        let valid_kinds = ["file"];
        if !valid_kinds.contains(&self.transport.kind.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "transport.kind".to_owned(),
                reason: format!("must be one of: {}", valid_kinds.join(", ")),
            }
            .into());
        }

        if self.transport.root_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "transport.root_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 배치 싱크 설정 (보정 전 원본 값)
///
/// 0 은 "지정하지 않음"으로 취급되어 기본값으로 대체됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    /// 싱크 이름 (로그 식별용)
    pub name: String,
    /// 전송 대상 스트림 이름 (필수)
    pub destination: String,
    /// 레코드 문자 인코딩
    pub encoding: String,
    /// 전송 계층 재시도 횟수
    pub max_retries: u32,
    /// 리전/로케이터
    pub region: String,
    /// 버퍼 크기 (KB, 5 ~ 1000)
    pub buffer_size_kb: i64,
    /// 최대 플러시 지연 (분, 1 ~ 60)
    pub max_put_record_delay_mins: i64,
    /// 비동기 전송 대기열 용량 (blob 개수)
    pub dispatch_queue_capacity: usize,
}

impl Default for SinkSection {
    fn default() -> Self {
        Self {
            name: "logfunnel".to_owned(),
            destination: String::new(),
            encoding: "UTF-8".to_owned(),
            max_retries: 3,
            region: "ap-northeast-1".to_owned(),
            buffer_size_kb: 1000,
            max_put_record_delay_mins: 5,
            dispatch_queue_capacity: 64,
        }
    }
}

/// 전송 계층 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    /// 전송 구현 종류 (file)
    pub kind: String,
    /// 파일 전송 루트 디렉토리
    pub root_dir: String,
    /// 재시도 백오프 기본 간격 (밀리초)
    pub retry_backoff_base_ms: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            kind: "file".to_owned(),
            root_dir: "/var/lib/logfunnel/streams".to_owned(),
            retry_backoff_base_ms: 100,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_i64(target: &mut i64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<i64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse i64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = LogfunnelConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.sink.buffer_size_kb, 1000);
        assert_eq!(config.sink.max_put_record_delay_mins, 5);
        assert_eq!(config.sink.max_retries, 3);
        assert_eq!(config.sink.region, "ap-northeast-1");
        assert!(config.sink.destination.is_empty());
        assert_eq!(config.transport.kind, "file");
    }

    #[test]
    fn default_config_passes_validation() {
        LogfunnelConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = LogfunnelConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.sink.encoding, "UTF-8");
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[sink]
destination = "app-logs"
buffer_size_kb = 2
"#;
        let config = LogfunnelConfig::parse(toml).unwrap();
        assert_eq!(config.sink.destination, "app-logs");
        // 원본 값 그대로 보관 (보정은 싱크 크레이트에서)
        assert_eq!(config.sink.buffer_size_kb, 2);
        assert_eq!(config.sink.max_put_record_delay_mins, 5);
        assert_eq!(config.general.log_format, "json");
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"

[sink]
name = "api-appender"
destination = "api-stream"
encoding = "ISO-8859-1"
max_retries = 5
region = "eu-west-1"
buffer_size_kb = 256
max_put_record_delay_mins = 90
dispatch_queue_capacity = 16

[transport]
kind = "file"
root_dir = "/tmp/logfunnel"
retry_backoff_base_ms = 50
"#;
        let config = LogfunnelConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.sink.name, "api-appender");
        assert_eq!(config.sink.max_retries, 5);
        assert_eq!(config.sink.max_put_record_delay_mins, 90);
        assert_eq!(config.sink.dispatch_queue_capacity, 16);
        assert_eq!(config.transport.root_dir, "/tmp/logfunnel");
        assert_eq!(config.transport.retry_backoff_base_ms, 50);
    }

    #[test]
    fn negative_sizes_are_kept_raw() {
        let config = LogfunnelConfig::parse("[sink]\nbuffer_size_kb = -3").unwrap();
        assert_eq!(config.sink.buffer_size_kb, -3);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = LogfunnelConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            LogfunnelError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = LogfunnelConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = LogfunnelConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_queue_capacity() {
        let mut config = LogfunnelConfig::default();
        config.sink.dispatch_queue_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dispatch_queue_capacity"));
    }

    #[test]
    fn validate_rejects_unknown_transport_kind() {
        let mut config = LogfunnelConfig::default();
        config.transport.kind = "kafka".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("transport.kind"));
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGFUNNEL_STR", "overridden") };
        override_string(&mut val, "TEST_LOGFUNNEL_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_LOGFUNNEL_STR") };
    }

    #[test]
    fn env_override_i64_invalid_keeps_original() {
        let mut val = 1000;
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_LOGFUNNEL_I64_BAD", "lots") };
        override_i64(&mut val, "TEST_LOGFUNNEL_I64_BAD");
        assert_eq!(val, 1000);
        unsafe { std::env::remove_var("TEST_LOGFUNNEL_I64_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 7u32;
        override_u32(&mut val, "TEST_LOGFUNNEL_NONEXISTENT_12345");
        assert_eq!(val, 7);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let mut config = LogfunnelConfig::default();
        config.sink.destination = "app-logs".to_owned();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LogfunnelConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.sink.destination, "app-logs");
        assert_eq!(parsed.transport.root_dir, config.transport.root_dir);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = LogfunnelConfig::from_file("/nonexistent/path/logfunnel.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LogfunnelError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
