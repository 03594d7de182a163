use std::ops::Range;

/// One raw token with its byte span in the preprocessed source.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub span: Range<usize>,
}

/// Split preprocessed source text into whitespace-separated tokens,
/// keeping double-quoted segments intact, and append an `<EOL>` marker
/// token after every physical line.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    for line in source.split('\n') {
        tokenize_line(line, pos, &mut tokens);
        let end = pos + line.len();
        tokens.push(Token {
            text: "<EOL>".to_string(),
            span: end..end,
        });
        pos = end + 1;
    }
    tokens
}

fn tokenize_line(line: &str, offset: usize, tokens: &mut Vec<Token>) {
    let bytes = line.as_bytes();
    let mut start = None;
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'"' {
            in_quotes = !in_quotes;
            if start.is_none() {
                start = Some(i);
            }
        } else if (c == b' ' || c == b'\t' || c == b'\r') && !in_quotes {
            if let Some(s) = start.take() {
                tokens.push(Token {
                    text: line[s..i].to_string(),
                    span: offset + s..offset + i,
                });
            }
        } else if start.is_none() {
            start = Some(i);
        }
        i += 1;
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: line[s..bytes.len()].to_string(),
            span: offset + s..offset + bytes.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_whitespace_with_eol_markers() {
        assert_eq!(
            texts("a b  c\nd"),
            ["a", "b", "c", "<EOL>", "d", "<EOL>"]
        );
    }

    #[test]
    fn empty_lines_yield_bare_eol() {
        assert_eq!(texts("a\n\nb"), ["a", "<EOL>", "<EOL>", "b", "<EOL>"]);
    }

    #[test]
    fn quoted_segments_stay_whole() {
        assert_eq!(
            texts("print \"hello world\" done."),
            ["print", "\"hello world\"", "done.", "<EOL>"]
        );
    }

    #[test]
    fn spans_index_into_source() {
        let source = "ab cd\nef";
        for t in tokenize(source) {
            if t.text != "<EOL>" {
                assert_eq!(&source[t.span.clone()], t.text);
            }
        }
    }
}
