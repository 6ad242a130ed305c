//! Transport-header post-processing: Reply-To, S/MIME content type, Date and From.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use crate::model::message::Smime;

static REPLY_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Reply-To:[ \t]*(?:<?(?P<name>.*?)>?)?[ \t]*(?:<(?P<address>.*?)>)?$")
        .expect("valid Reply-To regex")
});

/// Normalize CRLF (and stray CR) line endings to LF.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Unfold headers: continuation lines (leading space or tab) join the previous header.
///
/// Returns `(lowercase_name, value)` pairs in source order.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            result.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    result
}

fn header_values<'a>(
    headers: &'a [(String, String)],
    name: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .iter()
        .filter(move |(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Decode RFC 2047 encoded words, leaving the input untouched when there are none.
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }
    // mail-parser only decodes encoded words inside a header, so wrap one.
    let wrapped = format!("Subject: {input}\n\n");
    mail_parser::MessageParser::default()
        .parse(wrapped.as_bytes())
        .and_then(|m| m.subject().map(str::to_string))
        .unwrap_or_else(|| input.to_string())
}

/// `(name, address)` from the first `Reply-To:` line.
///
/// A bare value is used for both parts.
pub fn reply_to(headers: &str) -> Option<(String, String)> {
    let text = normalize_newlines(headers);
    let caps = REPLY_TO.captures(&text)?;
    let name = caps
        .name("name")
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty());
    let address = caps
        .name("address")
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty());

    match (name, address) {
        (name, Some(address)) => {
            let name = name.map_or_else(|| address.to_string(), clean_display_name);
            Some((name, address.to_string()))
        }
        (Some(only), None) => Some((clean_display_name(only), only.to_string())),
        (None, None) => None,
    }
}

fn clean_display_name(raw: &str) -> String {
    decode_encoded_words(raw.trim_matches('"').trim())
}

/// Split `type/subtype; key=value; ...` into the lowercase mime type and its parameters.
///
/// Parameter names are lowercased and surrounding quotes are stripped from values.
pub fn content_type_params(value: &str) -> (String, Vec<(String, String)>) {
    let mut parts = value.split(';');
    let mime = parts.next().unwrap_or("").trim().to_lowercase();
    let params = parts
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| {
            (
                k.trim().to_lowercase(),
                v.trim().trim_matches('"').to_string(),
            )
        })
        .collect();
    (mime, params)
}

fn param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Descriptor carried by the `application/pkcs7-mime` named property.
pub fn smime_application(value: &str) -> Option<Smime> {
    if !value.contains("application/") {
        return None;
    }
    let (mime, params) = content_type_params(value);
    Some(Smime::ApplicationSmime {
        mime,
        smime_type: param(&params, "smime-type"),
        name: param(&params, "name"),
    })
}

/// Descriptor carried by the `multipart/signed` named property.
pub fn smime_multipart_signed(value: &str) -> Option<Smime> {
    if !value.contains("multipart/signed") {
        return None;
    }
    let (mime, params) = content_type_params(value);
    Some(Smime::MultipartSigned {
        mime,
        protocol: param(&params, "protocol"),
        micalg: param(&params, "micalg"),
    })
}

/// Classify one `Content-Type` value as an S/MIME shape.
pub fn smime_from_content_type(value: &str) -> Option<Smime> {
    let (mime, params) = content_type_params(value);
    match mime.as_str() {
        "application/pkcs7-mime" | "application/x-pkcs7-mime" => Some(Smime::ApplicationSmime {
            mime,
            smime_type: param(&params, "smime-type"),
            name: param(&params, "name"),
        }),
        "multipart/signed" => Some(Smime::MultipartSigned {
            mime,
            protocol: param(&params, "protocol"),
            micalg: param(&params, "micalg"),
        }),
        "application/octet-stream" | "application/pkcs7-signature" => {
            Some(Smime::ApplicationOctetStream)
        }
        _ => None,
    }
}

/// First `Content-Type` header that describes an S/MIME shape.
pub fn smime_from_headers(headers: &str) -> Option<Smime> {
    let unfolded = unfold_headers(&normalize_newlines(headers));
    let found = header_values(&unfolded, "content-type").find_map(smime_from_content_type);
    found
}

/// First parseable `Date:` header.
pub fn date_from_headers(headers: &str) -> Option<DateTime<Utc>> {
    let unfolded = unfold_headers(&normalize_newlines(headers));
    let found = header_values(&unfolded, "date").find_map(parse_date);
    found
}

/// First `@`-bearing token of the first `From:` header, without brackets or quotes.
pub fn from_address(headers: &str) -> Option<String> {
    let unfolded = unfold_headers(&normalize_newlines(headers));
    let from = header_values(&unfolded, "from").next()?;
    from.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .map(|token| token.trim_matches(|c| matches!(c, '<' | '>' | '"' | '\'' | '(' | ')')))
        .find(|token| token.contains('@'))
        .map(str::to_string)
}

/// Parse a header date in RFC 2822, RFC 3339, or a handful of looser forms.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Drop a trailing comment such as "(UTC)" and the day of week.
    let without_comment = trimmed
        .split_once('(')
        .map_or(trimmed, |(head, _)| head)
        .trim();
    let candidate = without_comment
        .split_once(", ")
        .filter(|(dow, _)| dow.len() == 3)
        .map_or(without_comment, |(_, rest)| rest);

    const FORMATS: [&str; 5] = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%d %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    debug!(date = trimmed, "Could not parse header date");
    None
}

/// Last resort: let `mail-parser` read the value as a `Date:` header.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    let wrapped = format!("Date: {input}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(wrapped.as_bytes())?;
    let rfc3339 = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&rfc3339)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: &str = "Received: from mx.example.com\r\n\
        \tby relay.example.com\r\n\
        From: \"Alice Example\" <alice@example.com>\r\n\
        Reply-To: Support Desk <support@example.com>\r\n\
        Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n\
        Content-Type: multipart/signed; protocol=\"application/pkcs7-signature\";\r\n\
        \tmicalg=sha-256; boundary=\"xyz\"\r\n";

    #[test]
    fn test_unfold_headers() {
        let headers = unfold_headers(&normalize_newlines(HEADERS));
        assert_eq!(headers[0].0, "received");
        assert_eq!(headers[0].1, "from mx.example.com by relay.example.com");
        assert_eq!(headers.len(), 5);
    }

    #[test]
    fn test_reply_to_name_and_address() {
        assert_eq!(
            reply_to(HEADERS),
            Some(("Support Desk".to_string(), "support@example.com".to_string()))
        );
    }

    #[test]
    fn test_reply_to_bare_address() {
        assert_eq!(
            reply_to("Reply-To: <help@example.com>\n"),
            Some(("help@example.com".to_string(), "help@example.com".to_string()))
        );
        assert_eq!(
            reply_to("Reply-To: help@example.com"),
            Some(("help@example.com".to_string(), "help@example.com".to_string()))
        );
    }

    #[test]
    fn test_reply_to_encoded_name() {
        let (name, address) =
            reply_to("Reply-To: =?UTF-8?B?SG9sYSBtdW5kbw==?= <hola@example.com>").expect("reply-to");
        assert_eq!(name, "Hola mundo");
        assert_eq!(address, "hola@example.com");
    }

    #[test]
    fn test_reply_to_missing_or_empty() {
        assert_eq!(reply_to("From: a@b.c\n"), None);
        assert_eq!(reply_to("Reply-To: \n"), None);
    }

    #[test]
    fn test_smime_multipart_signed_header() {
        assert_eq!(
            smime_from_headers(HEADERS),
            Some(Smime::MultipartSigned {
                mime: "multipart/signed".into(),
                protocol: Some("application/pkcs7-signature".into()),
                micalg: Some("sha-256".into()),
            })
        );
    }

    #[test]
    fn test_smime_pkcs7_mime_header() {
        let headers =
            "Content-Type: application/pkcs7-mime; name=\"smime.p7m\"; smime-type=enveloped-data\n";
        assert_eq!(
            smime_from_headers(headers),
            Some(Smime::ApplicationSmime {
                mime: "application/pkcs7-mime".into(),
                smime_type: Some("enveloped-data".into()),
                name: Some("smime.p7m".into()),
            })
        );
    }

    #[test]
    fn test_smime_octet_stream_and_plain() {
        assert_eq!(
            smime_from_headers("Content-Type: application/octet-stream\n"),
            Some(Smime::ApplicationOctetStream)
        );
        assert_eq!(smime_from_headers("Content-Type: text/plain; charset=utf-8\n"), None);
    }

    #[test]
    fn test_smime_named_properties() {
        assert_eq!(
            smime_multipart_signed("multipart/signed;protocol=\"application/pkcs7-signature\";micalg=sha1"),
            Some(Smime::MultipartSigned {
                mime: "multipart/signed".into(),
                protocol: Some("application/pkcs7-signature".into()),
                micalg: Some("sha1".into()),
            })
        );
        assert_eq!(smime_multipart_signed("text/plain"), None);
        assert_eq!(
            smime_application("application/pkcs7-mime;smime-type=signed-data;name=smime.p7m"),
            Some(Smime::ApplicationSmime {
                mime: "application/pkcs7-mime".into(),
                smime_type: Some("signed-data".into()),
                name: Some("smime.p7m".into()),
            })
        );
    }

    #[test]
    fn test_date_from_headers() {
        let date = date_from_headers(HEADERS).expect("date");
        assert_eq!(date.format("%Y-%m-%d %H:%M").to_string(), "2024-01-04 10:00");
    }

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("04 Jan 2024 10:00:00 +0000").is_some());
        assert!(parse_date("Thu, 4 Jan 2024 10:00:00 +0000 (UTC)").is_some());
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_from_address() {
        assert_eq!(from_address(HEADERS), Some("alice@example.com".to_string()));
        assert_eq!(from_address("Subject: hi\n"), None);
    }
}
