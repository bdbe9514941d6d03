//! JavaScript minification: comment stripping and whitespace collapsing.
//!
//! Both passes know about string, template and regular-expression literals
//! and copy them verbatim:
//!
//! 1. [`strip_comments`] drops `//` and `/* */` comments. A block comment that
//!    spanned a line break leaves a newline behind.
//! 2. [`collapse_whitespace`] reduces each whitespace run to nothing, a single
//!    space, or a newline where automatic semicolon insertion may depend on it.
//!
//! Identifiers are never renamed. Output is deterministic, and malformed input
//! (an unterminated literal or block comment) is an `Err` rather than a panic.

/// Keywords after which `/` opens a regular expression
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Punctuation after which `/` opens a regular expression
const REGEX_PREFIX: &[char] = &[
    '(', ',', '=', ':', '[', '!', '&', '|', '?', '{', '}', ';', '+', '-', '*', '%', '<', '>', '~',
    '^',
];

const NO_SPACE_AFTER: &[char] = &[
    '(', '[', '{', ',', ';', ':', '=', '+', '-', '*', '/', '%', '&', '|', '^', '!', '~', '<', '>',
    '?', '.',
];

const NO_SPACE_BEFORE: &[char] = &[
    ')', ']', '}', ',', ';', ':', '=', '+', '-', '*', '/', '%', '&', '|', '^', '!', '~', '<', '>',
    '?', '.', '(',
];

/// A statement cannot end right after these
const NO_BREAK_AFTER: &[char] = &[
    '(', '[', '{', ',', ';', ':', '=', '*', '%', '&', '|', '^', '!', '~', '<', '>', '?', '.',
];

/// A line starting with these always continues the previous one
const NO_BREAK_BEFORE: &[char] = &[
    ')', ']', '}', '(', '[', ',', ';', ':', '=', '*', '%', '&', '|', '^', '?', '.', '<', '>',
];

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Whether a `/` following `out` starts a regex rather than a division
fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    let Some(last) = trimmed.chars().last() else {
        return true;
    };
    if REGEX_PREFIX.contains(&last) {
        return true;
    }
    if !is_word_char(last) {
        return false;
    }
    let before_word = trimmed.trim_end_matches(is_word_char);
    let word = &trimmed[before_word.len()..];
    !before_word.ends_with('.') && REGEX_KEYWORDS.contains(&word)
}

/// Index just past the literal opening at `chars[start]`
fn literal_end(chars: &[char], start: usize) -> Result<usize, String> {
    let open = chars[start];
    let mut in_class = false;
    let mut i = start + 1;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\\' {
            // `\` + CRLF is a single line continuation
            let crlf = chars.get(i + 1) == Some(&'\r') && chars.get(i + 2) == Some(&'\n');
            i += if crlf { 3 } else { 2 };
            continue;
        }

        match open {
            '`' => match ch {
                '`' => return Ok(i + 1),
                '$' if chars.get(i + 1) == Some(&'{') => {
                    i = substitution_end(chars, i + 2)?;
                    continue;
                }
                _ => {}
            },
            '/' => match ch {
                _ if is_line_break(ch) => break,
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    let mut end = i + 1;
                    while end < chars.len() && is_word_char(chars[end]) {
                        end += 1;
                    }
                    return Ok(end);
                }
                _ => {}
            },
            _ => {
                if ch == open {
                    return Ok(i + 1);
                }
                if is_line_break(ch) {
                    break;
                }
            }
        }
        i += 1;
    }

    let what = match open {
        '`' => "template literal",
        '/' => "regular expression",
        _ => "string literal",
    };
    Err(format!("unterminated {} at character {}", what, start))
}

/// Index just past the `}` closing a `${` substitution whose body starts at `start`
fn substitution_end(chars: &[char], start: usize) -> Result<usize, String> {
    let mut depth = 0usize;
    let mut i = start;

    while i < chars.len() {
        match chars[i] {
            '"' | '\'' | '`' => {
                i = literal_end(chars, i)?;
                continue;
            }
            '{' => depth += 1,
            '}' if depth == 0 => return Ok(i + 1),
            '}' => depth -= 1,
            _ => {}
        }
        i += 1;
    }

    Err(format!(
        "unterminated template substitution at character {}",
        start
    ))
}

/// Removes comments, leaving literals untouched.
pub fn strip_comments(input: &str) -> Result<String, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' | '\'' | '`' => {
                let end = literal_end(&chars, i)?;
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' => match chars.get(i + 1) {
                Some('/') => {
                    // The line break itself survives
                    while i < chars.len() && !is_line_break(chars[i]) {
                        i += 1;
                    }
                }
                Some('*') => {
                    let body = i + 2;
                    let close = (body..chars.len().saturating_sub(1))
                        .find(|&j| chars[j] == '*' && chars[j + 1] == '/')
                        .ok_or_else(|| format!("unterminated block comment at character {}", i))?;
                    let spans_lines = chars[body..close].iter().any(|&c| is_line_break(c));
                    out.push(if spans_lines { '\n' } else { ' ' });
                    i = close + 2;
                }
                _ if regex_allowed(&out) => {
                    let end = literal_end(&chars, i)?;
                    out.extend(&chars[i..end]);
                    i = end;
                }
                _ => {
                    out.push('/');
                    i += 1;
                }
            },
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Collapses whitespace runs outside of literals.
pub fn collapse_whitespace(input: &str) -> Result<String, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    // Some(saw_line_break) while inside a whitespace run
    let mut pending: Option<bool> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            pending = Some(pending.unwrap_or(false) || is_line_break(ch));
            i += 1;
            continue;
        }

        if let Some(line_break) = pending.take() {
            if let Some(sep) = out.chars().last().and_then(|prev| separator(prev, ch, line_break)) {
                out.push(sep);
            }
        }

        let literal = matches!(ch, '"' | '\'' | '`') || (ch == '/' && regex_allowed(&out));
        if literal {
            let end = literal_end(&chars, i)?;
            out.extend(&chars[i..end]);
            i = end;
        } else {
            out.push(ch);
            i += 1;
        }
    }

    Ok(out)
}

/// What replaces a whitespace run between `prev` and `next`
fn separator(prev: char, next: char, line_break: bool) -> Option<char> {
    if line_break && !NO_BREAK_AFTER.contains(&prev) && !NO_BREAK_BEFORE.contains(&next) {
        return Some('\n');
    }
    // `1 .toString()` must not become `1.toString()`
    if prev.is_ascii_digit() && next == '.' {
        return Some(' ');
    }
    // `a + ++b` must not become `a+++b`
    if (prev == '+' && next == '+') || (prev == '-' && next == '-') {
        return Some(' ');
    }
    if NO_SPACE_AFTER.contains(&prev) || NO_SPACE_BEFORE.contains(&next) {
        return None;
    }
    if is_word_char(prev) && is_word_char(next) {
        return Some(' ');
    }
    None
}

/// Minifies a JavaScript source string.
pub fn minify_js(input: &str) -> Result<String, String> {
    let no_comments = strip_comments(input)?;
    collapse_whitespace(&no_comments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_block_and_line_comments() {
        let output = strip_comments("/* block */ var x = 1; // line\nvar y;").unwrap();
        assert_eq!(output, "  var x = 1; \nvar y;");
    }

    #[test]
    fn test_multiline_block_comment_leaves_line_break() {
        let output = strip_comments("a\n/*\n * doc\n */b").unwrap();
        assert_eq!(output, "a\n\nb");
    }

    #[test]
    fn test_comment_markers_inside_literals() {
        let input = r#"var s = "/* not */"; var t = `// not`; var r = /\/\/x/;"#;
        assert_eq!(strip_comments(input).unwrap(), input);
    }

    #[test]
    fn test_collapse_whitespace() {
        let output = collapse_whitespace("function foo ( x ) { return x + 1 ; }").unwrap();
        assert_eq!(output, "function foo(x){return x+1;}");
    }

    #[test]
    fn test_line_breaks_kept_where_statements_may_end() {
        assert_eq!(
            minify_js("var a = 1\nvar b = 2").unwrap(),
            "var a=1\nvar b=2"
        );
        assert_eq!(minify_js("a = b\n++c").unwrap(), "a=b\n++c");
        assert_eq!(minify_js("var x = [\n  1,\n  2\n]").unwrap(), "var x=[1,2]");
    }

    #[test]
    fn test_bundle_separators_collapse() {
        let output = minify_js("var a=1;;\n\nvar b=2;;\n\n").unwrap();
        assert_eq!(output, "var a=1;;var b=2;;");
    }

    #[test]
    fn test_full_minify() {
        let input = "/* header */\nfunction add(a, b) {\n  // sum\n  return a + b;\n}\nvar s = 'it\\'s';\n";
        assert_eq!(
            minify_js(input).unwrap(),
            "function add(a,b){return a+b;}\nvar s='it\\'s';"
        );
    }

    #[test]
    fn test_regex_and_division() {
        assert_eq!(
            minify_js("var r = /a b\\/c/g; // x").unwrap(),
            "var r=/a b\\/c/g;"
        );
        assert_eq!(minify_js("x = a / b / c").unwrap(), "x=a/b/c");
        assert_eq!(
            minify_js("return /x y/.test(s)").unwrap(),
            "return/x y/.test(s)"
        );
    }

    #[test]
    fn test_escaped_backslash_closes_string() {
        assert_eq!(minify_js(r#"x = "a\\" + y"#).unwrap(), r#"x="a\\"+y"#);
    }

    #[test]
    fn test_nested_template_copied_verbatim() {
        let output = minify_js("var t = `a ${ b + `c` } d` ;").unwrap();
        assert_eq!(output, "var t=`a ${ b + `c` } d`;");
    }

    #[test]
    fn test_operator_merges_avoided() {
        assert_eq!(minify_js("a + ++b").unwrap(), "a+ ++b");
        assert_eq!(minify_js("a - -b").unwrap(), "a- -b");
        assert_eq!(minify_js("1 .toString()").unwrap(), "1 .toString()");
    }

    #[test]
    fn test_unterminated_input_is_an_error() {
        assert!(minify_js("var s = \"abc").is_err());
        assert!(minify_js("var s = 'abc\nd'").is_err());
        assert!(minify_js("var x; /* open").is_err());
        assert!(minify_js("var t = `abc").is_err());
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert_eq!(minify_js("").unwrap(), "");
        assert_eq!(minify_js(" \n\t ").unwrap(), "");
    }
}
