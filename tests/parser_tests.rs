//! Integration tests: compound files are built in memory and parsed end to end.

use std::io::{Cursor, Write};

use cfb::CompoundFile;

use msgshell::config::ParserConfig;
use msgshell::{parse, parse_file, parse_with, Attachment, MsgError, RecipientRole};

/// Writes streams and storages into a fresh in-memory compound file.
struct Fixture {
    comp: CompoundFile<Cursor<Vec<u8>>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            comp: CompoundFile::create(Cursor::new(Vec::new())).unwrap(),
        }
    }

    fn storage(mut self, path: &str) -> Self {
        self.comp.create_storage(path).unwrap();
        self
    }

    fn stream(mut self, path: &str, data: &[u8]) -> Self {
        {
            let mut s = self.comp.create_stream(path).unwrap();
            s.write_all(data).unwrap();
        }
        self
    }

    fn unicode(self, path: &str, text: &str) -> Self {
        self.stream(path, &utf16(text))
    }

    fn finish(mut self) -> Vec<u8> {
        self.comp.flush().unwrap();
        self.comp.into_inner().into_inner()
    }
}

fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// One fixed 8-byte record of a `__properties_version1.0` stream.
fn fixed8(tag: u16, type_code: u16, value: [u8; 8]) -> Vec<u8> {
    let mut out = ((u32::from(tag) << 16) | u32::from(type_code)).to_le_bytes().to_vec();
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&value);
    out
}

const JAN_1_2020_TICKS: i64 = 132_223_104_000_000_000;
const JAN_1_2020_MS: i64 = 1_577_836_800_000;

// ─── Test 1: Top-level fields ───────────────────────────────────────

#[test]
fn test_parse_basic_fields() {
    let bytes = Fixture::new()
        .unicode("/__substg1.0_001A001F", "IPM.Note")
        .unicode("/__substg1.0_0037001F", "Quarterly report")
        .unicode("/__substg1.0_0042001F", "Alice Example")
        .unicode("/__substg1.0_0C1F001F", "alice@example.com")
        .unicode("/__substg1.0_1000001F", "Numbers attached.")
        .unicode("/__substg1.0_1035001F", "<abc123@example.com>")
        .unicode(
            "/__substg1.0_007D001F",
            "Reply-To: \"Support Desk\" <support@example.com>\r\nSubject: Quarterly report\r\n",
        )
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.message_class(), "IPM.Note");
    assert_eq!(msg.subject(), Some("Quarterly report"));
    assert_eq!(msg.from_name(), Some("Alice Example"));
    assert_eq!(msg.from_email(), Some("alice@example.com"));
    assert_eq!(msg.body_text(), Some("Numbers attached."));
    assert_eq!(msg.message_id(), Some("<abc123@example.com>"));
    assert_eq!(msg.reply_to_name(), Some("Support Desk"));
    assert_eq!(msg.reply_to_email(), Some("support@example.com"));
    assert_eq!(msg.property_from_hex("0037").and_then(|v| v.as_text()), Some("Quarterly report"));
    assert!(msg.properties_as_hex().contains(&"0042".to_string()));
    assert!(msg.property_codes().contains(&0x1035));
}

// ─── Test 2: Recipients and roles ───────────────────────────────────

#[test]
fn test_parse_recipients_and_roles() {
    let bytes = Fixture::new()
        .unicode("/__substg1.0_0E04001F", "Jane Doe")
        .unicode("/__substg1.0_0E03001F", "John Roe")
        .storage("/__recip_version1.0_#00000000")
        .unicode("/__recip_version1.0_#00000000/__substg1.0_3001001F", "Jane Doe")
        .unicode("/__recip_version1.0_#00000000/__substg1.0_39FE001F", "jane@example.com")
        .storage("/__recip_version1.0_#00000001")
        .unicode("/__recip_version1.0_#00000001/__substg1.0_3001001F", "John Roe")
        .unicode(
            "/__recip_version1.0_#00000001/__substg1.0_3003001F",
            "/o=ExchangeLabs/ou=Exchange Administrative Group/cn=Recipients/cn=jroe",
        )
        .unicode("/__recip_version1.0_#00000001/__substg1.0_39FE001F", "john@example.com")
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.recipients().len(), 2);

    let to = msg.recipients_with_role(RecipientRole::To);
    assert_eq!(to.len(), 1);
    assert_eq!(to[0].to_string(), "Jane Doe <jane@example.com>");

    let cc = msg.cc_recipients();
    assert_eq!(cc.len(), 1);
    assert_eq!(cc[0].address(), Some("john@example.com"));
    assert!(cc[0].x500_address().is_some_and(|x| x.starts_with("/o=ExchangeLabs")));
    assert!(msg.bcc_recipients().is_empty());
}

// ─── Test 3: Name-only recipient falls back to its name ─────────────

#[test]
fn test_recipient_name_used_as_address() {
    let bytes = Fixture::new()
        .storage("/__recip_version1.0_#00000000")
        .unicode("/__recip_version1.0_#00000000/__substg1.0_3001001F", "bob@example.com")
        .finish();

    let msg = parse(&bytes).unwrap();
    let bob = &msg.recipients()[0];
    assert_eq!(bob.address(), Some("bob@example.com"));
    assert!(bob.name_was_used_as_address());
}

// ─── Test 4: Attachments and CID partition ──────────────────────────

#[test]
fn test_parse_attachments_and_cid_map() {
    let html = br#"<html><body><img src="cid:img1"></body></html>"#;
    let bytes = Fixture::new()
        .stream("/__substg1.0_10130102", html)
        .storage("/__attach_version1.0_#00000000")
        .unicode("/__attach_version1.0_#00000000/__substg1.0_3712001F", "img1")
        .unicode("/__attach_version1.0_#00000000/__substg1.0_3707001F", "logo.png")
        .unicode("/__attach_version1.0_#00000000/__substg1.0_370E001F", "image/png")
        .stream("/__attach_version1.0_#00000000/__substg1.0_37010102", b"\x89PNG\r\n")
        .storage("/__attach_version1.0_#00000001")
        .unicode("/__attach_version1.0_#00000001/__substg1.0_3704001F", "REPORT~1.PDF")
        .unicode("/__attach_version1.0_#00000001/__substg1.0_3707001F", "report.pdf")
        .stream("/__attach_version1.0_#00000001/__substg1.0_37010102", b"%PDF-1.4")
        .storage("/__attach_version1.0_#00000002")
        .unicode("/__attach_version1.0_#00000002/__substg1.0_3707001F", "empty.txt")
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.html_body(), Some(std::str::from_utf8(html).unwrap()));
    // The third attachment has no data and is dropped.
    assert_eq!(msg.attachments().len(), 2);

    let cids = msg.cid_map();
    assert_eq!(cids.len(), 1);
    assert_eq!(cids["img1"].long_filename(), Some("logo.png"));

    let real = msg.true_attachments();
    assert_eq!(real.len(), 1);
    let pdf = real[0].as_file().unwrap();
    assert_eq!(pdf.to_string(), "report.pdf");
    assert_eq!(pdf.filename(), Some("REPORT~1.PDF"));
    assert_eq!(pdf.size(), 8);
    assert_eq!(pdf.data(), b"%PDF-1.4");
}

// ─── Test 5: Nested messages and purge of empty ones ────────────────

#[test]
fn test_parse_nested_messages() {
    let bytes = Fixture::new()
        .unicode("/__substg1.0_0037001F", "Outer")
        .storage("/__attach_version1.0_#00000000")
        .storage("/__attach_version1.0_#00000000/__substg1.0_3701000D")
        .unicode("/__attach_version1.0_#00000000/__substg1.0_3701000D/__substg1.0_0037001F", "Inner")
        .storage("/__attach_version1.0_#00000000/__substg1.0_3701000D/__recip_version1.0_#00000000")
        .unicode(
            "/__attach_version1.0_#00000000/__substg1.0_3701000D/__recip_version1.0_#00000000/__substg1.0_3001001F",
            "Carol",
        )
        .storage("/__attach_version1.0_#00000001")
        .storage("/__attach_version1.0_#00000001/__substg1.0_3701000D")
        .unicode("/__attach_version1.0_#00000001/__substg1.0_3701000D/__substg1.0_0E04001F", "nobody")
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.subject(), Some("Outer"));
    assert_eq!(msg.attachments().len(), 1);
    let inner = msg.nested_messages()[0];
    assert_eq!(inner.subject(), Some("Inner"));
    assert_eq!(inner.recipients()[0].name(), Some("Carol"));
    assert!(matches!(msg.attachments()[0], Attachment::Nested(_)));
    // Outer recipients are not polluted by the inner ones.
    assert!(msg.recipients().is_empty());

    let keep_all = ParserConfig {
        purge_empty_nested: false,
        ..ParserConfig::default()
    };
    assert_eq!(parse_with(&bytes, &keep_all).unwrap().nested_messages().len(), 2);
}

// ─── Test 6: Properties stream with a truncated tail ────────────────

#[test]
fn test_parse_truncated_properties_stream() {
    let mut props = vec![0u8; 32];
    props.extend(fixed8(0x3007, 0x0040, JAN_1_2020_TICKS.to_le_bytes()));
    props.extend(fixed8(0x0E08, 0x0003, [0x10, 0, 0, 0, 0, 0, 0, 0]));
    // Header and flags of a time value whose payload is cut off.
    props.extend(fixed8(0x3008, 0x0040, [0; 8]).into_iter().take(10));

    let bytes = Fixture::new()
        .unicode("/__substg1.0_0037001F", "Timed")
        .stream("/__properties_version1.0", &props)
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.creation_date().map(|d| d.timestamp_millis()), Some(JAN_1_2020_MS));
    assert_eq!(msg.date(), msg.creation_date());
    assert_eq!(msg.last_modification_date(), None);
    assert!(msg.property(0x0E08).is_some());
}

// ─── Test 7: Date falls back to the transport headers ───────────────

#[test]
fn test_header_date_and_from_fallback() {
    let bytes = Fixture::new()
        .unicode(
            "/__substg1.0_007D001F",
            "From: Dave <dave@example.com>\r\nDate: Wed, 01 Jan 2020 00:00:00 +0000\r\n",
        )
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.date().map(|d| d.timestamp_millis()), Some(JAN_1_2020_MS));
    assert_eq!(msg.creation_date(), None);
    assert_eq!(msg.from_email(), Some("dave@example.com"));
}

// ─── Test 8: 8-bit strings use the configured code page ─────────────

#[test]
fn test_string8_code_page() {
    let bytes = Fixture::new()
        .stream("/__substg1.0_0037001E", b"Caf\xe9")
        .finish();

    assert_eq!(parse(&bytes).unwrap().subject(), Some("Café"));

    let cyrillic = ParserConfig {
        code_page: 1251,
        ..ParserConfig::default()
    };
    let bytes = Fixture::new()
        .stream("/__substg1.0_0037001E", b"\xcf\xf0\xe8\xe2\xe5\xf2")
        .finish();
    assert_eq!(parse_with(&bytes, &cyrillic).unwrap().subject(), Some("Привет"));
}

// ─── Test 9: Unreadable input ───────────────────────────────────────

#[test]
fn test_garbage_is_invalid_container() {
    let err = parse(b"this is not an OLE compound file").unwrap_err();
    assert!(matches!(err, MsgError::InvalidContainer(_)));
}

#[test]
fn test_parse_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse_file(&dir.path().join("absent.msg"), &ParserConfig::default()).unwrap_err();
    assert!(matches!(err, MsgError::FileNotFound(_)));
}

// ─── Test 10: File round trip through export ────────────────────────

#[test]
fn test_parse_file_and_export_attachments() {
    let bytes = Fixture::new()
        .unicode("/__substg1.0_0037001F", "With files")
        .storage("/__attach_version1.0_#00000000")
        .unicode("/__attach_version1.0_#00000000/__substg1.0_3707001F", "notes.txt")
        .stream("/__attach_version1.0_#00000000/__substg1.0_37010102", b"remember the milk")
        .finish();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.msg");
    std::fs::write(&path, &bytes).unwrap();

    let msg = parse_file(&path, &ParserConfig::default()).unwrap();
    let out = dir.path().join("out");
    let written = msgshell::export::attachment::export_all_attachments(&msg, &out).unwrap();
    assert_eq!(written, vec![out.join("notes.txt")]);
    assert_eq!(std::fs::read(&written[0]).unwrap(), b"remember the milk");
}

// ─── Test 11: Compressed RTF body and derived HTML ──────────────────

#[test]
fn test_compressed_rtf_plain_text_body() {
    let rtf = r"{\rtf1\ansi\ansicpg1252 Hello\par World}";
    let bytes = Fixture::new()
        .unicode("/__substg1.0_0037001F", "RTF only")
        .stream("/__substg1.0_10090102", &compressed_rtf::compress_rtf(rtf).unwrap())
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.body_rtf(), Some(rtf));
    assert_eq!(msg.body_html(), None);
    let html = msg.converted_body_html().unwrap();
    assert!(html.contains("Hello<br/>World"));
    assert_eq!(msg.html_body(), Some(html));

    let no_convert = ParserConfig {
        convert_rtf: false,
        ..ParserConfig::default()
    };
    let msg = parse_with(&bytes, &no_convert).unwrap();
    assert_eq!(msg.body_rtf(), Some(rtf));
    assert_eq!(msg.converted_body_html(), None);
}

#[test]
fn test_compressed_rtf_encapsulated_html() {
    let rtf = r"{\rtf1\ansi\fromhtml1 {\*\htmltag19 <html xmlns=x>}{\*\htmltag50 <body>}\htmlrtf {\htmlrtf0 Hi there{\*\htmltag58 </body>}{\*\htmltag27 </html>}}";
    let bytes = Fixture::new()
        .stream("/__substg1.0_10090102", &compressed_rtf::compress_rtf(rtf).unwrap())
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.body_rtf(), Some(rtf));
    assert_eq!(
        msg.converted_body_html(),
        Some("<html xmlns=x><body>Hi there</body></html>")
    );
}

#[test]
fn test_native_html_skips_conversion() {
    let bytes = Fixture::new()
        .stream("/__substg1.0_10130102", b"<html><body>native</body></html>")
        .stream(
            "/__substg1.0_10090102",
            &compressed_rtf::compress_rtf(r"{\rtf1 converted}").unwrap(),
        )
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.body_rtf(), Some(r"{\rtf1 converted}"));
    assert_eq!(msg.converted_body_html(), None);
    assert_eq!(msg.html_body(), Some("<html><body>native</body></html>"));
}

#[test]
fn test_compressed_rtf_uses_code_page() {
    let rtf = format!(r"{{\rtf1 {} price}}", char::from(0x80u8));
    let bytes = Fixture::new()
        .stream("/__substg1.0_10090102", &compressed_rtf::compress_rtf(&rtf).unwrap())
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.body_rtf(), Some(r"{\rtf1 € price}"));
    assert!(msg.converted_body_html().unwrap().contains("€ price"));
}

// ─── Test 12: Malformed RTF headers are skipped ─────────────────────

#[test]
fn test_oversized_uncompressed_rtf_is_skipped() {
    // MELA header announcing 1000 raw bytes with no payload behind it.
    let mut header = Vec::new();
    header.extend_from_slice(&12u32.to_le_bytes());
    header.extend_from_slice(&1000u32.to_le_bytes());
    header.extend_from_slice(b"MELA");
    header.extend_from_slice(&0u32.to_le_bytes());

    let bytes = Fixture::new()
        .unicode("/__substg1.0_0037001F", "Still readable")
        .stream("/__substg1.0_10090102", &header)
        .finish();

    let msg = parse(&bytes).unwrap();
    assert_eq!(msg.subject(), Some("Still readable"));
    assert_eq!(msg.body_rtf(), None);
    assert_eq!(msg.converted_body_html(), None);
    assert!(msg.property(0x1009).is_some());
}
