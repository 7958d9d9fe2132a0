//! 싱크 설정
//!
//! [`SinkConfig`]는 core의 [`SinkSection`](logfunnel_core::config::SinkSection) 원본 값에
//! 기본값 대체와 범위 보정을 적용한 최종 설정입니다.
//!
//! # 보정 규칙
//! - `buffer_size_kb`: 0 → 1000, 이후 [5, 1000]으로 clamp
//! - `max_put_record_delay_mins`: 0 → 5, 이후 [1, 60]으로 clamp
//! - `max_retries`: 0 → 3
//! - `region`: 비어 있으면 `ap-northeast-1`, 앞뒤 공백 제거
//! - `destination`: 필수, 앞뒤 공백 제거
//! - `encoding`: 인식하지 못하면 UTF-8
//!
//! # 사용 예시
//! ```ignore
//! use logfunnel_sink::config::SinkConfigBuilder;
//!
//! let config = SinkConfigBuilder::new("app-logs")
//!     .buffer_size_kb(256)
//!     .max_put_record_delay_mins(1)
//!     .build()?;
//! assert_eq!(config.buffer_capacity(), 256 * 1024);
//! ```

use std::time::Duration;

use logfunnel_core::config::SinkSection;

use crate::encoding::Charset;
use crate::error::SinkError;

/// 1 KB 단위 (바이트)
pub const BYTES_PER_KB: usize = 1024;

/// 기본 버퍼 크기 (KB)
pub const DEFAULT_BUFFER_SIZE_KB: u32 = 1000;
/// 최소 버퍼 크기 (KB)
pub const MIN_BUFFER_SIZE_KB: u32 = 5;
/// 최대 버퍼 크기 (KB)
pub const MAX_BUFFER_SIZE_KB: u32 = 1000;

/// 기본 최대 플러시 지연 (분)
pub const DEFAULT_MAX_PUT_RECORD_DELAY_MINS: u32 = 5;
/// 최소 플러시 지연 (분)
pub const MIN_MAX_PUT_RECORD_DELAY_MINS: u32 = 1;
/// 최대 플러시 지연 (분)
pub const MAX_MAX_PUT_RECORD_DELAY_MINS: u32 = 60;

/// 기본 재시도 횟수
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// 기본 리전
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// 단일 레코드 최대 크기 (1000 KB). 버퍼 용량과 무관한 전송 계층 한도입니다.
pub const MAX_RECORD_BYTES: usize = 1000 * BYTES_PER_KB;

/// 기본 비동기 전송 대기열 용량 (blob 개수)
pub const DEFAULT_DISPATCH_QUEUE_CAPACITY: usize = 64;

/// 보정이 끝난 싱크 설정
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// 싱크 이름 (로그 식별용)
    pub name: String,
    /// 전송 대상 스트림 이름
    pub destination: String,
    /// 레코드 문자 인코딩
    pub charset: Charset,
    /// 전송 계층 재시도 횟수
    pub max_retries: u32,
    /// 리전/로케이터
    pub region: String,
    /// 버퍼 크기 (KB, 5 ~ 1000)
    pub buffer_size_kb: u32,
    /// 최대 플러시 지연 (분, 1 ~ 60)
    pub max_put_record_delay_mins: u32,
    /// 비동기 전송 대기열 용량
    pub dispatch_queue_capacity: usize,
}

impl SinkConfig {
    /// core의 `[sink]` 섹션에서 싱크 설정을 생성합니다.
    ///
    /// `destination`이 비어 있으면 [`SinkError::Config`]를 반환합니다.
    pub fn from_core(section: &SinkSection) -> Result<Self, SinkError> {
        SinkConfigBuilder::new(section.destination.as_str())
            .name(section.name.as_str())
            .encoding(section.encoding.as_str())
            .max_retries(section.max_retries)
            .region(section.region.as_str())
            .buffer_size_kb(section.buffer_size_kb)
            .max_put_record_delay_mins(section.max_put_record_delay_mins)
            .dispatch_queue_capacity(section.dispatch_queue_capacity)
            .build()
    }

    /// 버퍼 용량을 바이트로 반환합니다.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_size_kb as usize * BYTES_PER_KB
    }

    /// 최대 플러시 지연을 `Duration`으로 반환합니다.
    pub fn max_put_record_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_put_record_delay_mins) * 60)
    }
}

/// 싱크 설정 빌더
///
/// 수치 값은 원본(보정 전) 그대로 받아 `build()`에서 보정합니다.
pub struct SinkConfigBuilder {
    name: String,
    destination: String,
    encoding: String,
    max_retries: u32,
    region: String,
    buffer_size_kb: i64,
    max_put_record_delay_mins: i64,
    dispatch_queue_capacity: usize,
}

impl SinkConfigBuilder {
    /// 대상 스트림 이름으로 새 빌더를 생성합니다.
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            name: "logfunnel".to_owned(),
            destination: destination.into(),
            encoding: String::new(),
            max_retries: 0,
            region: String::new(),
            buffer_size_kb: 0,
            max_put_record_delay_mins: 0,
            dispatch_queue_capacity: DEFAULT_DISPATCH_QUEUE_CAPACITY,
        }
    }

    /// 싱크 이름을 설정합니다.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 인코딩 이름을 설정합니다.
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// 재시도 횟수를 설정합니다 (0이면 기본값).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// 리전을 설정합니다.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// 버퍼 크기(KB)를 설정합니다.
    pub fn buffer_size_kb(mut self, kb: i64) -> Self {
        self.buffer_size_kb = kb;
        self
    }

    /// 최대 플러시 지연(분)을 설정합니다.
    pub fn max_put_record_delay_mins(mut self, mins: i64) -> Self {
        self.max_put_record_delay_mins = mins;
        self
    }

    /// 비동기 전송 대기열 용량을 설정합니다.
    pub fn dispatch_queue_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_queue_capacity = capacity;
        self
    }

    /// 보정 규칙을 적용하고 `SinkConfig`를 생성합니다.
    pub fn build(self) -> Result<SinkConfig, SinkError> {
        let destination = self.destination.trim();
        if destination.is_empty() {
            return Err(SinkError::Config {
                field: "destination".to_owned(),
                reason: format!("destination cannot be blank for sink: {}", self.name),
            });
        }

        if self.dispatch_queue_capacity == 0 {
            return Err(SinkError::Config {
                field: "dispatch_queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let region = self.region.trim();
        check_path_component("destination", destination)?;
        check_path_component("region", region)?;

        Ok(SinkConfig {
            destination: destination.to_owned(),
            charset: Charset::from_name(&self.encoding),
            max_retries: default_if_zero(self.max_retries, DEFAULT_MAX_RETRIES),
            region: if region.is_empty() {
                DEFAULT_REGION.to_owned()
            } else {
                region.to_owned()
            },
            buffer_size_kb: clamp_or_default(
                self.buffer_size_kb,
                DEFAULT_BUFFER_SIZE_KB,
                MIN_BUFFER_SIZE_KB,
                MAX_BUFFER_SIZE_KB,
            ),
            max_put_record_delay_mins: clamp_or_default(
                self.max_put_record_delay_mins,
                DEFAULT_MAX_PUT_RECORD_DELAY_MINS,
                MIN_MAX_PUT_RECORD_DELAY_MINS,
                MAX_MAX_PUT_RECORD_DELAY_MINS,
            ),
            dispatch_queue_capacity: self.dispatch_queue_capacity,
            name: self.name,
        })
    }
}

/// 전송 계층이 이름을 경로 요소로 쓰므로 구분자와 상위 디렉토리 참조를 거부합니다.
fn check_path_component(field: &str, value: &str) -> Result<(), SinkError> {
    let invalid = value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(SinkError::Config {
            field: field.to_owned(),
            reason: format!("'{value}' must not contain path separators or be '.' / '..'"),
        });
    }
    Ok(())
}

fn default_if_zero(value: u32, default: u32) -> u32 {
    if value == 0 { default } else { value }
}

fn clamp_or_default(value: i64, default: u32, min: u32, max: u32) -> u32 {
    if value == 0 {
        return default;
    }
    let clamped = value.clamp(i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(default)
}
