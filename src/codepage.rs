//! Supported "ASCII" codepages for extended-ASCII strings.
//!
//! Windows 9x/Me registry files store key names, value names and string data
//! in the system codepage. The set of codepages accepted here is fixed; any
//! other identifier (including every `iso-8859-*` and `koi8` variant) is
//! rejected.

use crate::error::{RegistryError, Result};
use encoding_rs::Encoding;
use std::fmt;
use std::str::FromStr;

/// A supported codepage for extended-ASCII strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Codepage {
    /// 7-bit US-ASCII (Windows codepage 20127).
    Ascii,
    /// Thai.
    Windows874,
    /// Japanese (Shift_JIS).
    Windows932,
    /// Simplified Chinese (GBK).
    Windows936,
    /// Korean.
    Windows949,
    /// Traditional Chinese (Big5).
    Windows950,
    /// Central European.
    Windows1250,
    /// Cyrillic.
    Windows1251,
    /// Western European.
    #[default]
    Windows1252,
    /// Greek.
    Windows1253,
    /// Turkish.
    Windows1254,
    /// Hebrew.
    Windows1255,
    /// Arabic.
    Windows1256,
    /// Baltic.
    Windows1257,
    /// Vietnamese.
    Windows1258,
}

impl Codepage {
    /// Every supported codepage, in identifier order.
    pub const ALL: [Codepage; 15] = [
        Codepage::Ascii,
        Codepage::Windows874,
        Codepage::Windows932,
        Codepage::Windows936,
        Codepage::Windows949,
        Codepage::Windows950,
        Codepage::Windows1250,
        Codepage::Windows1251,
        Codepage::Windows1252,
        Codepage::Windows1253,
        Codepage::Windows1254,
        Codepage::Windows1255,
        Codepage::Windows1256,
        Codepage::Windows1257,
        Codepage::Windows1258,
    ];

    /// Looks up a codepage by identifier (`"ascii"`, `"cp1252"`, ...).
    ///
    /// Matching ignores ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedCodepage`] for any identifier
    /// outside the supported set.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|codepage| codepage.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| RegistryError::UnsupportedCodepage(name.to_string()))
    }

    /// Looks up a codepage by its Windows codepage number.
    pub fn from_number(number: u32) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|codepage| codepage.number() == number)
            .ok_or_else(|| RegistryError::UnsupportedCodepage(number.to_string()))
    }

    /// Returns the identifier of this codepage.
    pub fn name(&self) -> &'static str {
        match self {
            Codepage::Ascii => "ascii",
            Codepage::Windows874 => "cp874",
            Codepage::Windows932 => "cp932",
            Codepage::Windows936 => "cp936",
            Codepage::Windows949 => "cp949",
            Codepage::Windows950 => "cp950",
            Codepage::Windows1250 => "cp1250",
            Codepage::Windows1251 => "cp1251",
            Codepage::Windows1252 => "cp1252",
            Codepage::Windows1253 => "cp1253",
            Codepage::Windows1254 => "cp1254",
            Codepage::Windows1255 => "cp1255",
            Codepage::Windows1256 => "cp1256",
            Codepage::Windows1257 => "cp1257",
            Codepage::Windows1258 => "cp1258",
        }
    }

    /// Returns the Windows codepage number.
    pub fn number(&self) -> u32 {
        match self {
            Codepage::Ascii => 20127,
            Codepage::Windows874 => 874,
            Codepage::Windows932 => 932,
            Codepage::Windows936 => 936,
            Codepage::Windows949 => 949,
            Codepage::Windows950 => 950,
            Codepage::Windows1250 => 1250,
            Codepage::Windows1251 => 1251,
            Codepage::Windows1252 => 1252,
            Codepage::Windows1253 => 1253,
            Codepage::Windows1254 => 1254,
            Codepage::Windows1255 => 1255,
            Codepage::Windows1256 => 1256,
            Codepage::Windows1257 => 1257,
            Codepage::Windows1258 => 1258,
        }
    }

    /// Returns the decoder backing this codepage, `None` for plain ASCII.
    fn encoding(&self) -> Option<&'static Encoding> {
        match self {
            Codepage::Ascii => None,
            Codepage::Windows874 => Some(encoding_rs::WINDOWS_874),
            Codepage::Windows932 => Some(encoding_rs::SHIFT_JIS),
            Codepage::Windows936 => Some(encoding_rs::GBK),
            Codepage::Windows949 => Some(encoding_rs::EUC_KR),
            Codepage::Windows950 => Some(encoding_rs::BIG5),
            Codepage::Windows1250 => Some(encoding_rs::WINDOWS_1250),
            Codepage::Windows1251 => Some(encoding_rs::WINDOWS_1251),
            Codepage::Windows1252 => Some(encoding_rs::WINDOWS_1252),
            Codepage::Windows1253 => Some(encoding_rs::WINDOWS_1253),
            Codepage::Windows1254 => Some(encoding_rs::WINDOWS_1254),
            Codepage::Windows1255 => Some(encoding_rs::WINDOWS_1255),
            Codepage::Windows1256 => Some(encoding_rs::WINDOWS_1256),
            Codepage::Windows1257 => Some(encoding_rs::WINDOWS_1257),
            Codepage::Windows1258 => Some(encoding_rs::WINDOWS_1258),
        }
    }

    /// Decodes a byte string in this codepage.
    ///
    /// Trailing NUL characters are trimmed. Unmappable bytes become U+FFFD.
    pub fn decode(&self, data: &[u8]) -> String {
        let decoded = match self.encoding() {
            Some(encoding) => encoding.decode_without_bom_handling(data).0.into_owned(),
            None => data
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        };

        decoded.trim_end_matches('\0').to_string()
    }
}

impl FromStr for Codepage {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for Codepage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
