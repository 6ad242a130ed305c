//! Export functionality: attachment extraction, text summaries and JSON.

pub mod attachment;
pub mod json;
pub mod text;

/// Replace everything except alphanumerics and `-._@` with `_`, capped at `max_len` chars.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '@') {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    // A bare "." or ".." would escape the output directory.
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world", 20), "hello_world");
        assert_eq!(sanitize_filename_part("report.pdf", 30), "report.pdf");
        assert_eq!(sanitize_filename_part("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_filename_part("", 20), "unknown");
        assert_eq!(sanitize_filename_part("..", 20), "unknown");
        assert_eq!(sanitize_filename_part("abcdef", 3), "abc");
    }
}
