//! Best-effort text decoding for foreign word lists.
//!
//! Libraries come from arbitrary spreadsheet exports, so the importer tries an
//! ordered list of encodings and keeps the first strict, non-empty decode.

use encoding_rs::{BIG5, EUC_KR, GB18030, SHIFT_JIS, UTF_16BE, UTF_16LE, WINDOWS_1252};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    Utf16le,
    Utf16be,
    Gb18030,
    Big5,
    ShiftJis,
    EucKr,
    Windows1252,
    Latin1,
}

pub const DEFAULT_PRIORITY: [TextEncoding; 8] = [
    TextEncoding::Utf8,
    TextEncoding::Utf16le,
    TextEncoding::Utf16be,
    TextEncoding::Gb18030,
    TextEncoding::Big5,
    TextEncoding::ShiftJis,
    TextEncoding::EucKr,
    TextEncoding::Latin1,
];

impl TextEncoding {
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16le => "utf-16le",
            TextEncoding::Utf16be => "utf-16be",
            TextEncoding::Gb18030 => "gb18030",
            TextEncoding::Big5 => "big5",
            TextEncoding::ShiftJis => "shift_jis",
            TextEncoding::EucKr => "euc-kr",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "latin1",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        let encoding = match normalized.as_str() {
            "utf-8" | "utf8" => TextEncoding::Utf8,
            "utf-16le" | "utf16le" | "utf-16" => TextEncoding::Utf16le,
            "utf-16be" | "utf16be" => TextEncoding::Utf16be,
            "gb18030" | "gbk" | "gb2312" => TextEncoding::Gb18030,
            "big5" => TextEncoding::Big5,
            "shift-jis" | "sjis" => TextEncoding::ShiftJis,
            "euc-kr" => TextEncoding::EucKr,
            "windows-1252" | "cp1252" => TextEncoding::Windows1252,
            "latin1" | "latin-1" | "iso-8859-1" => TextEncoding::Latin1,
            _ => return None,
        };
        Some(encoding)
    }

    /// Strictly decode `bytes`; `None` if the bytes are not valid here.
    pub fn try_decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            TextEncoding::Utf16le => {
                let body = bytes.strip_prefix(b"\xFF\xFE")?;
                decode_strict(UTF_16LE, body)
            }
            TextEncoding::Utf16be => {
                let body = bytes.strip_prefix(b"\xFE\xFF")?;
                decode_strict(UTF_16BE, body)
            }
            TextEncoding::Gb18030 => decode_strict(GB18030, bytes),
            TextEncoding::Big5 => decode_strict(BIG5, bytes),
            TextEncoding::ShiftJis => decode_strict(SHIFT_JIS, bytes),
            TextEncoding::EucKr => decode_strict(EUC_KR, bytes),
            TextEncoding::Windows1252 => decode_strict(WINDOWS_1252, bytes),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Try each encoding in order and return the first non-empty decode.
pub fn decode_bytes(bytes: &[u8], priority: &[TextEncoding]) -> Option<(String, TextEncoding)> {
    priority.iter().find_map(|&encoding| {
        encoding
            .try_decode(bytes)
            .filter(|text| !text.is_empty())
            .map(|text| (text, encoding))
    })
}

fn decode_strict(encoding: &'static encoding_rs::Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}
