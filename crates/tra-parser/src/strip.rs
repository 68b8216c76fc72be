//! Comment stripping.
//!
//! Identifiers that appear only inside comments must not produce matches, so
//! every extractor runs over a comment-stripped copy of the source. Comment
//! bytes are replaced with spaces to keep line numbers and byte offsets
//! stable.

/// Replace `//` line comments and `/* */` block comments with spaces.
///
/// String and template literals are honoured so a `//` inside a URL string
/// is not treated as a comment.
pub fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());

    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str(u8),
    }

    let mut state = State::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::Code => match b {
                b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                    state = State::LineComment;
                    out.push(b' ');
                }
                b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                    state = State::BlockComment;
                    out.push(b' ');
                }
                b'\'' | b'"' | b'`' => {
                    state = State::Str(b);
                    out.push(b);
                }
                _ => out.push(b),
            },
            State::LineComment => {
                if b == b'\n' {
                    state = State::Code;
                    out.push(b'\n');
                } else {
                    out.push(b' ');
                }
            }
            State::BlockComment => {
                if b == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                    out.push(b' ');
                    out.push(b' ');
                    i += 1;
                    state = State::Code;
                } else if b == b'\n' {
                    out.push(b'\n');
                } else {
                    out.push(b' ');
                }
            }
            State::Str(quote) => {
                out.push(b);
                if b == b'\\' && i + 1 < bytes.len() {
                    out.push(bytes[i + 1]);
                    i += 1;
                } else if b == quote {
                    state = State::Code;
                }
            }
        }
        i += 1;
    }

    // Comment bytes were replaced with ASCII spaces; everything else was
    // copied verbatim, so the buffer is still valid UTF-8.
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comment_removed() {
        let out = strip_comments("const a = 1; // fetch('/api/users')\nconst b = 2;");
        assert!(!out.contains("fetch"));
        assert!(out.contains("const b = 2;"));
    }

    #[test]
    fn test_block_comment_preserves_lines() {
        let src = "a\n/* fetch('/x')\n   more */\nb";
        let out = strip_comments(src);
        assert_eq!(out.lines().count(), src.lines().count());
        assert!(!out.contains("fetch"));
    }

    #[test]
    fn test_url_in_string_is_kept() {
        let out = strip_comments("fetch('https://example.com/path')");
        assert!(out.contains("https://example.com/path"));
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let out = strip_comments(r#"const s = "say \"hi\""; // gone"#);
        assert!(out.contains(r#"\"hi\""#));
        assert!(!out.contains("gone"));
    }
}
