//! Character-field charset resolution.
//!
//! DBF files don't carry a charset name. A charset chosen by the caller
//! always wins. Otherwise the language-driver byte at header offset 29 hints
//! at a code page, and when it is zero or unknown GBK is used, which is what
//! many Chinese-locale DBF producers assume.

use encoding_rs::{
    Encoding, BIG5, EUC_KR, GBK, IBM866, SHIFT_JIS, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252,
    WINDOWS_1253, WINDOWS_1254, WINDOWS_874,
};

/// Charset used when neither the caller nor the header names one.
pub static DEFAULT_ENCODING: &Encoding = &encoding_rs::GBK_INIT;

/// Map a language-driver id to a code page, if it names one we can decode.
pub fn encoding_for_language_driver(driver: u8) -> Option<&'static Encoding> {
    match driver {
        0x03 | 0x57 | 0x58 | 0x59 => Some(WINDOWS_1252),
        0x13 | 0x7B => Some(SHIFT_JIS),
        0x4D | 0x7A => Some(GBK),
        0x4E | 0x79 => Some(EUC_KR),
        0x4F | 0x78 => Some(BIG5),
        0x26 | 0x65 => Some(IBM866),
        0x7C => Some(WINDOWS_874),
        0xC8 => Some(WINDOWS_1250),
        0xC9 => Some(WINDOWS_1251),
        0xCA => Some(WINDOWS_1254),
        0xCB => Some(WINDOWS_1253),
        _ => None,
    }
}

/// Pick the charset for a file: explicit choice, then header hint, then default.
pub fn resolve(explicit: Option<&'static Encoding>, language_driver: u8) -> &'static Encoding {
    explicit
        .or_else(|| encoding_for_language_driver(language_driver))
        .unwrap_or(DEFAULT_ENCODING)
}

/// Look up an encoding by WHATWG label ("gbk", "utf-8", "windows-1252", ...).
pub fn from_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}
