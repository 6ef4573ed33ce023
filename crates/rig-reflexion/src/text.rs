//! Small string helpers shared by steps and parsers

/// First `max_chars` characters of `s`, never splitting a code point
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Like [`truncate_chars`], with `"..."` appended when something was cut
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    let cut = truncate_chars(s, max_chars);
    if cut.len() < s.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_ascii() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("hi", 5), "hi");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("abcdef", 3), "abc...");
        assert_eq!(ellipsize("abc", 3), "abc");
    }
}
