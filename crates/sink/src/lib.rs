#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`buffer`]: 고정 용량 레코드 버퍼 및 오버플로우 정책
//! - [`guard`]: 크기 초과 레코드 가드
//! - `scheduler`: 재무장 가능한 지연 플러시 타이머 (내부 전용)
//! - [`transport`]: 전송 계층 trait 및 파일 구현
//! - [`sink`]: 배치 싱크 생명주기 및 디스패치
//! - [`writer`]: `std::io::Write` / `MakeWriter` 어댑터
//! - [`encoding`]: 레코드 문자 인코딩
//! - [`config`]: 싱크 설정 (core 설정 보정)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! append() -> OversizeGuard -> RecordBuffer --(overflow / timer)--> dispatch queue -> Transport
//!                                   |                                                   ^
//!                               FlushTimer                       close() -- final Sync --+
//! ```

pub mod buffer;
pub mod config;
pub mod encoding;
pub mod error;
pub mod guard;
pub(crate) mod scheduler;
pub mod sink;
pub mod transport;
pub mod writer;

// --- 주요 타입 re-export ---

// 싱크
pub use sink::{AppendOutcome, BatchSink, BatchSinkBuilder, FlushTrigger, SinkState, SinkStats};

// 설정
pub use config::{SinkConfig, SinkConfigBuilder};

// 에러
pub use error::{SinkError, TransportError};

// 전송
pub use transport::{DestinationStatus, DispatchMode, FileTransport, Transport};

// 기타
pub use encoding::Charset;
pub use guard::OversizeGuard;
pub use writer::SinkWriter;
