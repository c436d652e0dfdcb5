//! # Tokenizer / Top-level Splitter
//!
//! Turns raw model or data text into semicolon-terminated statements while
//! preserving 1-based source line numbers for diagnostics:
//!
//! 1. Strip `/* ... */` block comments, keeping line breaks so downstream
//!    line numbers stay accurate. An unclosed block comment swallows the
//!    rest of the file.
//! 2. Extract `execute { ... }` blocks and `tuple Name { ... }` schema
//!    blocks by balanced brace matching; inline `subject to { ... }`
//!    wrappers. Braces inside double-quoted strings do not count.
//! 3. Strip `//` line comments.
//! 4. Split on `;`, recording each statement's first non-empty line.

/// One top-level statement with its origin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub text: String,
    pub line: usize,
}

/// A brace-delimited block lifted out of the source before splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCapture {
    /// Optional block name (`execute init { ... }`, `tuple Arc { ... }`).
    pub name: Option<String>,
    /// Text between the braces, braces excluded.
    pub body: String,
    /// Line of the block's opening keyword.
    pub line: usize,
}

/// Result of splitting one source file.
#[derive(Debug, Default)]
pub struct SplitSource {
    pub statements: Vec<RawStatement>,
    pub tuple_blocks: Vec<BlockCapture>,
    pub execute_blocks: Vec<BlockCapture>,
}

/// Strip `/* ... */` comments, replacing their contents with spaces but
/// keeping every line break. An unclosed comment blanks to end of input.
pub fn strip_block_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    let mut in_string = false;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            in_string = !in_string;
            out.push(c);
            i += 1;
        } else if !in_string && c == '/' && chars.get(i + 1) == Some(&'*') {
            // Scan for the closing */; blank everything but newlines.
            let mut j = i + 2;
            let mut closed = false;
            out.push_str("  ");
            while j < chars.len() {
                if chars[j] == '*' && chars.get(j + 1) == Some(&'/') {
                    out.push_str("  ");
                    j += 2;
                    closed = true;
                    break;
                }
                out.push(if chars[j] == '\n' { '\n' } else { ' ' });
                j += 1;
            }
            if !closed {
                // Unclosed: the remainder is comment.
                return out;
            }
            i = j;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Strip a `//` comment from one line, respecting string literals.
pub fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_string = false;
    for i in 0..bytes.len() {
        let c = bytes[i] as char;
        if c == '"' {
            in_string = !in_string;
        } else if !in_string && c == '/' && i + 1 < bytes.len() && bytes[i + 1] as char == '/' {
            return line[..i].trim_end();
        }
    }
    line
}

/// Position of the `}` matching the `{` at `open`, ignoring braces inside
/// double-quoted strings. `None` when unbalanced.
fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if c == '"' {
            in_string = !in_string;
        } else if !in_string {
            if c == '{' {
                depth += 1;
            } else if c == '}' {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
    }
    None
}

fn line_of(chars: &[char], pos: usize) -> usize {
    1 + chars[..pos].iter().filter(|&&c| c == '\n').count()
}

/// Blank a span, keeping newlines so later line numbers survive.
fn blank_span(chars: &mut [char], from: usize, to: usize) {
    for c in chars.iter_mut().take(to).skip(from) {
        if *c != '\n' {
            *c = ' ';
        }
    }
}

/// Find `keyword` at a word boundary outside strings, starting at `from`.
fn find_keyword(chars: &[char], keyword: &str, from: usize) -> Option<usize> {
    let pattern: Vec<char> = keyword.chars().collect();
    let mut in_string = false;
    let mut i = from;
    while i + pattern.len() <= chars.len() {
        let c = chars[i];
        if c == '"' {
            in_string = !in_string;
            i += 1;
            continue;
        }
        if !in_string
            && chars[i..i + pattern.len()] == pattern[..]
            && (i == 0 || !is_ident_char(chars[i - 1]))
            && chars
                .get(i + pattern.len())
                .map_or(true, |&c| !is_ident_char(c))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn skip_ws(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn read_ident(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    if i >= chars.len() || !chars[i].is_ascii_alphabetic() {
        return None;
    }
    let mut name = String::new();
    while i < chars.len() && is_ident_char(chars[i]) {
        name.push(chars[i]);
        i += 1;
    }
    Some((name, i))
}

/// Lift every `keyword [name] { ... }` block out of the text, returning the
/// captures. The spans are blanked in place.
fn extract_blocks(
    chars: &mut Vec<char>,
    keyword: &str,
    named: bool,
) -> Result<Vec<BlockCapture>, String> {
    let mut blocks = Vec::new();
    let mut search = 0;
    while let Some(start) = find_keyword(chars, keyword, search) {
        let mut cursor = skip_ws(chars, start + keyword.len());
        let mut name = None;
        if named {
            if let Some((ident, after)) = read_ident(chars, cursor) {
                name = Some(ident);
                cursor = skip_ws(chars, after);
            }
        }
        if chars.get(cursor) != Some(&'{') {
            // Not a block form (e.g. an identifier that merely starts with
            // the keyword letters would not match, but `execute` without a
            // brace is malformed).
            search = cursor.max(start + 1);
            continue;
        }
        let close = matching_brace(chars, cursor).ok_or_else(|| {
            format!(
                "unbalanced braces in '{keyword}' block starting on line {}",
                line_of(chars, start)
            )
        })?;
        let body: String = chars[cursor + 1..close].iter().collect();
        blocks.push(BlockCapture {
            name,
            body,
            line: line_of(chars, start),
        });
        blank_span(chars, start, close + 1);
        search = close + 1;
    }
    Ok(blocks)
}

/// Replace every `subject to { X }` with `X` in place.
fn inline_subject_to(chars: &mut Vec<char>) -> Result<(), String> {
    let mut search = 0;
    while let Some(start) = find_keyword(chars, "subject", search) {
        let after = skip_ws(chars, start + "subject".len());
        let is_to = read_ident(chars, after).map(|(word, _)| word == "to") == Some(true);
        if !is_to {
            search = start + 1;
            continue;
        }
        let brace = skip_ws(chars, after + "to".len());
        if chars.get(brace) != Some(&'{') {
            search = start + 1;
            continue;
        }
        let close = matching_brace(chars, brace).ok_or_else(|| {
            format!(
                "unbalanced braces in 'subject to' block starting on line {}",
                line_of(chars, start)
            )
        })?;
        blank_span(chars, start, brace + 1);
        blank_span(chars, close, close + 1);
        search = close + 1;
    }
    Ok(())
}

/// Split comment-stripped text into `;`-terminated statements.
fn split_statements(chars: &[char]) -> Vec<RawStatement> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut line = 1usize;
    let mut stmt_line: Option<usize> = None;
    let mut in_string = false;
    for &c in chars {
        if c == '\n' {
            line += 1;
        }
        if c == '"' {
            in_string = !in_string;
        }
        if c == ';' && !in_string {
            if let Some(origin) = stmt_line {
                let text = current.trim().to_string();
                if !text.is_empty() {
                    out.push(RawStatement { text, line: origin });
                }
            }
            current.clear();
            stmt_line = None;
            continue;
        }
        if stmt_line.is_none() && !c.is_whitespace() {
            stmt_line = Some(line);
        }
        current.push(c);
    }
    if let Some(origin) = stmt_line {
        let text = current.trim().to_string();
        if !text.is_empty() {
            out.push(RawStatement { text, line: origin });
        }
    }
    out
}

/// Split a model file: block comments, block extraction, line comments,
/// statement splitting.
pub fn split_model_source(source: &str) -> Result<SplitSource, String> {
    let stripped = strip_block_comments(source);
    let mut chars: Vec<char> = stripped.chars().collect();

    let execute_blocks = extract_blocks(&mut chars, "execute", true)?;
    inline_subject_to(&mut chars)?;
    let tuple_blocks = extract_blocks(&mut chars, "tuple", true)?;

    let decommented = strip_lines(&chars);
    Ok(SplitSource {
        statements: split_statements(&decommented),
        tuple_blocks,
        execute_blocks,
    })
}

/// Split a data file: same lexical rules, no block forms.
pub fn split_data_source(source: &str) -> Vec<RawStatement> {
    let stripped = strip_block_comments(source);
    let chars: Vec<char> = stripped.chars().collect();
    let decommented = strip_lines(&chars);
    split_statements(&decommented)
}

fn strip_lines(chars: &[char]) -> Vec<char> {
    let text: String = chars.iter().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut first = true;
    for line in text.split('\n') {
        if !first {
            out.push('\n');
        }
        out.extend(strip_line_comment(line).chars());
        first = false;
    }
    out
}
