//! Windows code page and charset-label resolution on top of `encoding_rs`.

use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;

/// Label prefixes probed against a numeric code page, in order.
const CODE_PAGE_PREFIXES: [&str; 7] = ["", "cp", "iso-", "ibm", "x-windows-", "ms", "windows-"];

static CHARSET_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset=(?:"([\w\-]+)"|([\w\-]+))"#).expect("valid charset regex")
});

/// Resolve a Windows code page number to an encoding.
///
/// Tries the common label spellings first, then a table of code pages whose
/// WHATWG label is not derivable from the number.
pub fn encoding_for_code_page(code_page: u32) -> Option<&'static Encoding> {
    CODE_PAGE_PREFIXES
        .iter()
        .find_map(|prefix| Encoding::for_label(format!("{prefix}{code_page}").as_bytes()))
        .or_else(|| well_known_code_page(code_page))
}

fn well_known_code_page(code_page: u32) -> Option<&'static Encoding> {
    let label = match code_page {
        65001 => "utf-8",
        932 => "shift_jis",
        936 => "gbk",
        949 => "euc-kr",
        950 => "big5",
        874 => "windows-874",
        1200 => "utf-16le",
        1201 => "utf-16be",
        10000 => "macintosh",
        20127 | 28591 => "windows-1252",
        20866 => "koi8-r",
        21866 => "koi8-u",
        50220..=50222 => "iso-2022-jp",
        51932 => "euc-jp",
        54936 => "gb18030",
        28592..=28599 => return iso_8859(code_page - 28590),
        28603 => "iso-8859-13",
        28605 => "iso-8859-15",
        _ => return None,
    };
    Encoding::for_label(label.as_bytes())
}

fn iso_8859(part: u32) -> Option<&'static Encoding> {
    Encoding::for_label(format!("iso-8859-{part}").as_bytes())
}

/// The code page encoding, or windows-1252 when it cannot be resolved.
pub fn encoding_or_default(code_page: u32) -> &'static Encoding {
    encoding_for_code_page(code_page).unwrap_or_else(|| {
        tracing::debug!(code_page, "Unknown code page, using windows-1252");
        encoding_rs::WINDOWS_1252
    })
}

/// Decode bytes without letting a BOM switch the encoding.
pub fn decode(encoding: &'static Encoding, bytes: &[u8]) -> String {
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

/// Look for a `charset=` marker inside already-decoded text.
pub fn embedded_charset(text: &str) -> Option<&'static Encoding> {
    let caps = CHARSET_MARKER.captures(text)?;
    let label = caps.get(1).or_else(|| caps.get(2))?.as_str();
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_code_pages() {
        assert_eq!(encoding_for_code_page(1252), Some(encoding_rs::WINDOWS_1252));
        assert_eq!(encoding_for_code_page(1251), Some(encoding_rs::WINDOWS_1251));
        assert_eq!(encoding_for_code_page(866), Some(encoding_rs::IBM866));
    }

    #[test]
    fn test_well_known_code_pages() {
        assert_eq!(encoding_for_code_page(65001), Some(encoding_rs::UTF_8));
        assert_eq!(encoding_for_code_page(932), Some(encoding_rs::SHIFT_JIS));
        assert_eq!(encoding_for_code_page(28592), Some(encoding_rs::ISO_8859_2));
        assert_eq!(encoding_for_code_page(20866), Some(encoding_rs::KOI8_R));
    }

    #[test]
    fn test_unknown_code_page() {
        assert_eq!(encoding_for_code_page(4242), None);
        assert_eq!(encoding_or_default(4242), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn test_embedded_charset_quoted_and_bare() {
        assert_eq!(
            embedded_charset(r#"<meta content="text/html; charset="utf-8">"#),
            Some(encoding_rs::UTF_8)
        );
        assert_eq!(
            embedded_charset("Content-Type: text/plain; CHARSET=iso-8859-2"),
            Some(encoding_rs::ISO_8859_2)
        );
        assert_eq!(embedded_charset("charset=bogus-thing"), None);
        assert_eq!(embedded_charset("no marker here"), None);
    }

    #[test]
    fn test_decode_ignores_bom_switch() {
        let text = decode(encoding_rs::WINDOWS_1252, &[0xEF, 0xBB, 0xBF, b'a']);
        assert_eq!(text.chars().count(), 4);
    }
}
