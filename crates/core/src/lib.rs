//! logfunnel 공통 타입 -- 에러, 설정, 메트릭 이름
//!
//! # 모듈 구성
//!
//! - [`config`]: `logfunnel.toml` 파싱, 환경변수 오버라이드, 검증
//! - [`error`]: 최상위 에러 및 설정 에러
//! - [`metrics`]: 메트릭 이름 상수 및 설명 등록

pub mod config;
pub mod error;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LogfunnelError, SinkFailure};

// 설정
pub use config::{GeneralConfig, LogfunnelConfig, SinkSection, TransportSection};
