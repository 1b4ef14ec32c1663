//! Encoding resolution and code-unit level decoding.
//!
//! The backward scanner never decodes partial buffers. It walks files one
//! code unit at a time (1 byte for UTF-8/ASCII, 2 for UTF-16, 4 for UTF-32)
//! and only decodes fully accumulated lines, so a multi-byte character split
//! across two buffer reads can never be corrupted.

use crate::error::{Error, Result};
use std::str::FromStr;

/// A byte-decoding scheme for file content. UTF-16 and UTF-32 are
/// little-endian; a leading byte order mark is recognized and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16,
    Utf32,
    Ascii,
}

impl Encoding {
    /// Canonical configuration name for this encoding.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf16 => "utf-16",
            Encoding::Utf32 => "utf-32",
            Encoding::Ascii => "ascii",
        }
    }

    /// Width in bytes of one code unit.
    pub(crate) fn unit_len(self) -> usize {
        match self {
            Encoding::Utf8 | Encoding::Ascii => 1,
            Encoding::Utf16 => 2,
            Encoding::Utf32 => 4,
        }
    }

    /// Byte order mark this encoding may carry at the start of a file.
    /// Empty for ASCII, which has none.
    pub(crate) fn bom(self) -> &'static [u8] {
        match self {
            Encoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            Encoding::Utf16 => &[0xFF, 0xFE],
            Encoding::Utf32 => &[0xFF, 0xFE, 0x00, 0x00],
            Encoding::Ascii => &[],
        }
    }

    /// Whether a single code unit is the line feed character.
    pub(crate) fn is_line_feed(self, unit: &[u8]) -> bool {
        match self {
            Encoding::Utf8 | Encoding::Ascii => unit == [0x0A],
            Encoding::Utf16 => unit == [0x0A, 0x00],
            Encoding::Utf32 => unit == [0x0A, 0x00, 0x00, 0x00],
        }
    }

    /// Whether a single code unit is the carriage return character.
    pub(crate) fn is_carriage_return(self, unit: &[u8]) -> bool {
        match self {
            Encoding::Utf8 | Encoding::Ascii => unit == [0x0D],
            Encoding::Utf16 => unit == [0x0D, 0x00],
            Encoding::Utf32 => unit == [0x0D, 0x00, 0x00, 0x00],
        }
    }

    /// Decode a complete byte sequence into text.
    pub(crate) fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| Error::Decode {
                encoding: self.name(),
                message: e.to_string(),
            }),
            Encoding::Ascii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(Error::Decode {
                        encoding: self.name(),
                        message: format!("byte 0x{:02X} at offset {pos} is not ASCII", bytes[pos]),
                    });
                }
                // All bytes verified ASCII, which is a UTF-8 subset.
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
            Encoding::Utf16 => {
                if bytes.len() % 2 != 0 {
                    return Err(Error::Decode {
                        encoding: self.name(),
                        message: format!("{} bytes is not a whole number of UTF-16 units", bytes.len()),
                    });
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|e| Error::Decode {
                    encoding: self.name(),
                    message: e.to_string(),
                })
            }
            Encoding::Utf32 => {
                if bytes.len() % 4 != 0 {
                    return Err(Error::Decode {
                        encoding: self.name(),
                        message: format!("{} bytes is not a whole number of UTF-32 units", bytes.len()),
                    });
                }
                bytes
                    .chunks_exact(4)
                    .map(|quad| {
                        let value = u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                        char::from_u32(value).ok_or_else(|| Error::Decode {
                            encoding: self.name(),
                            message: format!("0x{value:08X} is not a Unicode scalar value"),
                        })
                    })
                    .collect()
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-16" | "utf16" => Ok(Encoding::Utf16),
            "utf-32" | "utf32" => Ok(Encoding::Utf32),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            other => Err(Error::invalid_argument(format!(
                "unknown encoding name: {other}"
            ))),
        }
    }
}
