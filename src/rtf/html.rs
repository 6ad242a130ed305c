//! RTF to HTML conversion.
//!
//! A single left-to-right scanner interprets control words against a stack of
//! group states. Encapsulated HTML (`\fromhtml` bodies whose `\*\htmltag`
//! groups rebuild the original markup) comes out as-is; plain RTF text is
//! escaped and wrapped in a monospace envelope.

use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;
use thiserror::Error;

use crate::parser::charset;

/// Longest control word accepted by the scanner.
const MAX_CONTROL_WORD: usize = 32;

const ENVELOPE_OPEN: &str =
    r#"<html><body style="font-family:'Courier',monospace;font-size:10pt;">"#;
const ENVELOPE_CLOSE: &str = "</body></html>";

/// Destination groups whose content never reaches the output.
const IGNORED_DESTINATIONS: [&str; 12] = [
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "themedata",
    "latentstyles",
    "datastore",
];

static HTML_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<html[\s>].*?</html>").expect("valid html regex"));

/// Conversion failures. The message is kept without a derived HTML body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RtfError {
    /// `\ansicpg` named a code page with no known encoding.
    #[error("unknown code page {0} in \\ansicpg")]
    UnknownCodePage(i32),

    /// The input ended right after a backslash.
    #[error("control sequence truncated at offset {0}")]
    TruncatedControl(usize),
}

/// Per-group interpreter state, copied on `{` and restored on `}`.
#[derive(Debug, Clone, Copy)]
struct Group {
    /// Destination whose content is dropped.
    ignore: bool,
    /// Inside `\htmlrtf` ... `\htmlrtf0`.
    html_rtf: bool,
    /// Fallback units to skip after `\uN`.
    unicode_skip: usize,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            ignore: false,
            html_rtf: false,
            unicode_skip: 1,
        }
    }
}

impl Group {
    fn suppressed(&self) -> bool {
        self.ignore || self.html_rtf
    }
}

/// Convert an RTF document to HTML.
///
/// `encoding` decodes `\'XX` escapes until an `\ansicpg` word replaces it.
pub fn rtf_to_html(rtf: &str, encoding: &'static Encoding) -> Result<String, RtfError> {
    let text = Interpreter::new(rtf, encoding).run()?;
    if let Some(fragment) = HTML_FRAGMENT.find(&text) {
        return Ok(strip_stray(fragment.as_str()));
    }
    Ok(envelope(&text))
}

struct Interpreter {
    chars: Vec<char>,
    pos: usize,
    stack: Vec<Group>,
    encoding: &'static Encoding,
    out: String,
    /// High surrogate waiting for its `\u` partner.
    pending_high: Option<u16>,
}

/// A parsed `\word-123 ` or `\x` sequence.
enum Control {
    Word { name: String, param: Option<i32> },
    Symbol(char),
}

impl Interpreter {
    fn new(rtf: &str, encoding: &'static Encoding) -> Self {
        Self {
            chars: rtf.chars().collect(),
            pos: 0,
            stack: vec![Group::default()],
            encoding,
            out: String::with_capacity(rtf.len() / 2),
            pending_high: None,
        }
    }

    fn group(&self) -> Group {
        self.stack.last().copied().unwrap_or_default()
    }

    fn group_mut(&mut self) -> Option<&mut Group> {
        self.stack.last_mut()
    }

    fn emit(&mut self, text: &str) {
        if !self.group().suppressed() {
            self.out.push_str(text);
        }
    }

    fn emit_char(&mut self, c: char) {
        if !self.group().suppressed() {
            self.out.push(c);
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<String, RtfError> {
        while let Some(c) = self.peek(0) {
            match c {
                '\r' | '\n' => self.pos += 1,
                '{' => {
                    let current = self.group();
                    self.stack.push(current);
                    self.pos += 1;
                }
                '}' => {
                    self.stack.pop();
                    self.pos += 1;
                    // Closing the document group ends the scan.
                    if self.stack.len() <= 1 {
                        break;
                    }
                }
                '\\' => {
                    if self.peek(1) == Some('\'') && self.hex_byte_at(self.pos + 2).is_some() {
                        self.hex_run();
                    } else {
                        let control = self.read_control()?;
                        self.apply(control)?;
                    }
                }
                other => {
                    self.emit_char(other);
                    self.pos += 1;
                }
            }
        }
        Ok(self.out)
    }

    fn hex_byte_at(&self, at: usize) -> Option<u8> {
        let hi = self.chars.get(at)?.to_digit(16)?;
        let lo = self.chars.get(at + 1)?.to_digit(16)?;
        u8::try_from(hi * 16 + lo).ok()
    }

    /// Decode a run of consecutive `\'XX` escapes as one byte sequence.
    fn hex_run(&mut self) {
        let mut bytes = Vec::new();
        while self.peek(0) == Some('\\') && self.peek(1) == Some('\'') {
            let Some(byte) = self.hex_byte_at(self.pos + 2) else {
                break;
            };
            bytes.push(byte);
            self.pos += 4;
        }
        let decoded = charset::decode(self.encoding, &bytes);
        self.emit(&decoded);
    }

    fn read_control(&mut self) -> Result<Control, RtfError> {
        let start = self.pos;
        self.pos += 1;
        let Some(first) = self.peek(0) else {
            return Err(RtfError::TruncatedControl(start));
        };
        if !first.is_ascii_alphabetic() {
            self.pos += 1;
            return Ok(Control::Symbol(first));
        }

        let mut name = String::new();
        while let Some(c) = self.peek(0).filter(char::is_ascii_alphabetic) {
            if name.len() == MAX_CONTROL_WORD {
                break;
            }
            name.push(c);
            self.pos += 1;
        }

        let mut digits = String::new();
        if self.peek(0) == Some('-') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            digits.push('-');
            self.pos += 1;
        }
        while let Some(c) = self.peek(0).filter(char::is_ascii_digit) {
            digits.push(c);
            self.pos += 1;
        }
        let param = if digits.is_empty() {
            None
        } else {
            // Out-of-range parameters saturate rather than fail.
            Some(digits.parse::<i64>().map_or(0, |n| n.clamp(i32::MIN as i64, i32::MAX as i64) as i32))
        };

        if self.peek(0) == Some(' ') {
            self.pos += 1;
        }
        Ok(Control::Word { name, param })
    }

    fn apply(&mut self, control: Control) -> Result<(), RtfError> {
        match control {
            Control::Symbol(symbol) => self.apply_symbol(symbol),
            Control::Word { name, param } => self.apply_word(&name, param)?,
        }
        Ok(())
    }

    fn apply_symbol(&mut self, symbol: char) {
        match symbol {
            '{' | '}' | '\\' => self.emit_char(symbol),
            '~' => self.emit_char('\u{00A0}'),
            '_' => self.emit_char('-'),
            '*' => {
                // Unknown destinations are skipped; `\*\htmltag` carries markup.
                let keeps_markup = self.chars[self.pos..]
                    .iter()
                    .take(8)
                    .collect::<String>()
                    .starts_with("\\htmltag");
                if !keeps_markup {
                    if let Some(group) = self.group_mut() {
                        group.ignore = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn apply_word(&mut self, name: &str, param: Option<i32>) -> Result<(), RtfError> {
        match name {
            "par" | "line" => self.emit_char('\n'),
            "tab" => self.emit_char('\t'),
            "htmlrtf" => {
                // Only an explicit `\htmlrtf0` ends suppression.
                if let Some(group) = self.group_mut() {
                    group.html_rtf = param != Some(0);
                }
            }
            "ansicpg" => {
                let code_page = param.unwrap_or(1252);
                self.encoding = u32::try_from(code_page)
                    .ok()
                    .and_then(charset::encoding_for_code_page)
                    .ok_or(RtfError::UnknownCodePage(code_page))?;
            }
            "uc" => {
                if let Some(group) = self.group_mut() {
                    group.unicode_skip = param.map_or(1, |n| usize::try_from(n).unwrap_or(0));
                }
            }
            "u" => {
                if let Some(n) = param {
                    self.unicode_char(n);
                }
            }
            "bin" => {
                // Raw binary payload: skip it without interpreting braces.
                let len = param.and_then(|n| usize::try_from(n).ok()).unwrap_or(0);
                self.pos = (self.pos + len).min(self.chars.len());
            }
            word if IGNORED_DESTINATIONS.contains(&word) => {
                if let Some(group) = self.group_mut() {
                    group.ignore = true;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn unicode_char(&mut self, n: i32) {
        let unit = if n < 0 { n + 65536 } else { n };
        let unit = u16::try_from(unit).unwrap_or(0xFFFD);
        match unit {
            0xD800..=0xDBFF => self.pending_high = Some(unit),
            0xDC00..=0xDFFF => {
                if let Some(high) = self.pending_high.take() {
                    let decoded = String::from_utf16_lossy(&[high, unit]);
                    self.emit(&decoded);
                } else {
                    self.emit_char(char::REPLACEMENT_CHARACTER);
                }
            }
            _ => {
                self.pending_high = None;
                let c = char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER);
                self.emit_char(c);
            }
        }
        self.skip_fallback();
    }

    /// Skip the ANSI fallback that follows `\uN`.
    fn skip_fallback(&mut self) {
        let mut remaining = self.group().unicode_skip;
        while remaining > 0 {
            match self.peek(0) {
                None | Some('{') | Some('}') => break,
                Some('\\') => {
                    if self.peek(1) == Some('\'') && self.hex_byte_at(self.pos + 2).is_some() {
                        self.pos += 4;
                    } else {
                        break;
                    }
                }
                Some(_) => self.pos += 1,
            }
            remaining -= 1;
        }
    }
}

/// Escape interpreter text and wrap it in the monospace envelope.
///
/// Line-break runs become one `<br/>`, bare `http://` and `mailto:` tokens become links.
fn envelope(text: &str) -> String {
    let chars: Vec<char> = text.chars().filter(|c| *c != '\r' && *c != '\0').collect();
    let mut html = String::with_capacity(text.len() + ENVELOPE_OPEN.len() + ENVELOPE_CLOSE.len());
    html.push_str(ENVELOPE_OPEN);

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            // Collapse newlines separated only by blanks; keep blanks after the last one.
            let mut last_newline = i;
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                if chars[j] == '\n' {
                    last_newline = j;
                }
                j += 1;
            }
            html.push_str("<br/>");
            i = last_newline + 1;
            continue;
        }
        if let Some(consumed) = push_link(&chars[i..], &mut html) {
            i += consumed;
            continue;
        }
        push_escaped(&mut html, c);
        i += 1;
    }

    html.push_str(ENVELOPE_CLOSE);
    html
}

/// Emit a link when `rest` starts with a linkable token. Returns the chars consumed.
fn push_link(rest: &[char], html: &mut String) -> Option<usize> {
    let is_http = starts_with(rest, "http://");
    if !is_http && !starts_with(rest, "mailto:") {
        return None;
    }
    let token_len = rest.iter().take_while(|c| !c.is_whitespace()).count();
    let token: String = rest[..token_len].iter().collect();

    if is_http {
        if token_len == "http://".len() {
            return None;
        }
        let escaped = escape(&token);
        html.push_str(&format!("<a href=\"{escaped}\">{escaped}</a>"));
        return Some(token_len);
    }

    let address = &token["mailto:".len()..];
    let valid = address
        .split_once('@')
        .is_some_and(|(user, host)| !user.is_empty() && !host.is_empty());
    if !valid {
        return None;
    }
    let escaped = escape(address);
    html.push_str(&format!("<a href=\"mailto:{escaped}\">{escaped}</a>"));
    Some(token_len)
}

fn starts_with(rest: &[char], prefix: &str) -> bool {
    let mut chars = rest.iter();
    prefix.chars().all(|p| chars.next() == Some(&p))
}

fn push_escaped(html: &mut String, c: char) {
    match c {
        '&' => html.push_str("&amp;"),
        '<' => html.push_str("&lt;"),
        '>' => html.push_str("&gt;"),
        other => html.push(other),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_escaped(&mut out, c);
    }
    out
}

fn strip_stray(text: &str) -> String {
    text.chars().filter(|c| *c != '\r' && *c != '\0').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(rtf: &str) -> String {
        rtf_to_html(rtf, encoding_rs::WINDOWS_1252).expect("conversion")
    }

    fn body(html: &str) -> &str {
        html.strip_prefix(ENVELOPE_OPEN)
            .and_then(|s| s.strip_suffix(ENVELOPE_CLOSE))
            .expect("envelope")
    }

    #[test]
    fn test_hello_par_world() {
        let html = convert(r"{\rtf1\ansicpg1252 Hello\par World}");
        assert_eq!(body(&html), "Hello<br/>World");
        assert!(!html.contains('\\'));
    }

    #[test]
    fn test_font_and_color_tables_ignored() {
        let html = convert(
            r"{\rtf1\ansi{\fonttbl{\f0\fswiss Arial;}}{\colortbl;\red0\green0\blue0;}\f0 Text}",
        );
        assert_eq!(body(&html), "Text");
    }

    #[test]
    fn test_hex_escapes_use_code_page() {
        assert_eq!(body(&convert(r"{\rtf1 caf\'e9}")), "café");
        let html = convert(r"{\rtf1\ansicpg1251 \'cf\'f0\'e8}");
        assert_eq!(body(&html), "При");
    }

    #[test]
    fn test_multibyte_hex_run() {
        let html = convert(r"{\rtf1\ansicpg932 \'82\'a0}");
        assert_eq!(body(&html), "あ");
    }

    #[test]
    fn test_unicode_with_fallback() {
        assert_eq!(body(&convert(r"{\rtf1 \u8364?x}")), "€x");
        assert_eq!(body(&convert(r"{\rtf1\uc2 \u8364\'80\'80y}")), "€y");
        assert_eq!(body(&convert(r"{\rtf1 \u-3913?}")), "\u{F0B7}");
    }

    #[test]
    fn test_unicode_surrogate_pair() {
        assert_eq!(body(&convert(r"{\rtf1 \u-10179?\u-8704?}")), "😀");
    }

    #[test]
    fn test_escaped_symbols_and_html_escaping() {
        let html = convert(r"{\rtf1 a\{b\}c\\d <tag> & x\~y}");
        assert_eq!(body(&html), "a{b}c\\d &lt;tag&gt; &amp; x\u{00A0}y");
    }

    #[test]
    fn test_htmlrtf_suppresses_text() {
        let html = convert(r"{\rtf1 keep\htmlrtf drop\htmlrtf0  kept}");
        assert_eq!(body(&html), "keep kept");
    }

    #[test]
    fn test_htmlrtf_nonzero_param_suppresses() {
        let html = convert(r"{\rtf1 a\htmlrtf1  b\htmlrtf0  c}");
        assert_eq!(body(&html), "a c");
    }

    #[test]
    fn test_encapsulated_html_returned_directly() {
        let rtf = r"{\rtf1\ansi\fromhtml1 {\*\htmltag19 <html xmlns=x>}{\*\htmltag50 <body>}\htmlrtf {\htmlrtf0 Hi there{\*\htmltag58 </body>}{\*\htmltag27 </html>}}";
        let html = convert(rtf);
        assert_eq!(html, "<html xmlns=x><body>Hi there</body></html>");
    }

    #[test]
    fn test_unknown_destination_ignored() {
        let html = convert(r"{\rtf1 {\*\generator Riched20;}visible}");
        assert_eq!(body(&html), "visible");
    }

    #[test]
    fn test_line_break_runs_collapse() {
        let html = convert(r"{\rtf1 one\par\par \par  two\line three}");
        assert_eq!(body(&html), "one<br/> two<br/>three");
    }

    #[test]
    fn test_autolinks() {
        let html = convert(r"{\rtf1 see http://example.com/a?b=1 or mailto:me@example.com now}");
        assert_eq!(
            body(&html),
            "see <a href=\"http://example.com/a?b=1\">http://example.com/a?b=1</a> or \
             <a href=\"mailto:me@example.com\">me@example.com</a> now"
        );
    }

    #[test]
    fn test_text_after_document_group_dropped() {
        assert_eq!(body(&convert(r"{\rtf1 in}out")), "in");
    }

    #[test]
    fn test_unknown_code_page_is_error() {
        assert_eq!(
            rtf_to_html(r"{\rtf1\ansicpg4242 x}", encoding_rs::WINDOWS_1252),
            Err(RtfError::UnknownCodePage(4242))
        );
    }

    #[test]
    fn test_trailing_backslash_is_error() {
        assert!(matches!(
            rtf_to_html(r"{\rtf1 x\", encoding_rs::WINDOWS_1252),
            Err(RtfError::TruncatedControl(_))
        ));
    }

    #[test]
    fn test_bin_payload_skipped() {
        assert_eq!(body(&convert("{\\rtf1 a\\bin3 }{}b}")), "ab");
    }
}
