//! 레코드 문자 인코딩
//!
//! 텍스트 레코드는 싱크에 들어가기 전에 설정된 [`Charset`]으로 인코딩됩니다.
//! 인식하지 못한 인코딩 이름은 경고 없이 UTF-8로 대체됩니다.
//! 대상 문자셋으로 표현할 수 없는 문자는 `?`로 치환됩니다.

use std::borrow::Cow;
use std::fmt;

/// 지원하는 문자 인코딩
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8 (기본값)
    #[default]
    Utf8,
    /// 7비트 ASCII
    UsAscii,
    /// ISO-8859-1 (Latin-1)
    Latin1,
    /// UTF-16 빅 엔디언 (BOM 없음)
    Utf16Be,
    /// UTF-16 리틀 엔디언 (BOM 없음)
    Utf16Le,
}

const REPLACEMENT: u8 = b'?';

impl Charset {
    /// 인코딩 이름을 해석합니다. 대소문자와 구분자(`-`, `_`)는 무시합니다.
    ///
    /// 빈 문자열이나 알 수 없는 이름이면 [`Charset::Utf8`]을 반환합니다.
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "usascii" | "ascii" => Self::UsAscii,
            "iso88591" | "latin1" => Self::Latin1,
            "utf16be" => Self::Utf16Be,
            "utf16le" => Self::Utf16Le,
            _ => Self::Utf8,
        }
    }

    /// 정규화된 인코딩 이름을 반환합니다.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::UsAscii => "US-ASCII",
            Self::Latin1 => "ISO-8859-1",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
        }
    }

    /// 문자열을 이 문자셋의 바이트열로 인코딩합니다.
    ///
    /// UTF-8과 순수 ASCII 입력은 복사 없이 원본을 빌려 반환합니다.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        match self {
            Self::Utf8 => Cow::Borrowed(text.as_bytes()),
            Self::UsAscii | Self::Latin1 if text.is_ascii() => Cow::Borrowed(text.as_bytes()),
            Self::UsAscii => Cow::Owned(
                text.chars()
                    .map(|c| if c.is_ascii() { c as u8 } else { REPLACEMENT })
                    .collect(),
            ),
            Self::Latin1 => Cow::Owned(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                    .collect(),
            ),
            Self::Utf16Be => Cow::Owned(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            Self::Utf16Le => Cow::Owned(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
