//! Safety checks for model-generated SQL.
//!
//! A generated query is accepted only if it is a single read-only `SELECT`
//! against the configured table. Anything else is rejected with
//! [`MedSourceError::InvalidQuery`] so the caller can fall back to keyword
//! retrieval.

use medsource_shared::{MedSourceError, Result};

/// Keywords that close a `FROM` clause at its own nesting depth.
const FROM_CLAUSE_END: &[&str] = &[
    "where", "group", "order", "limit", "having", "window", "union", "intersect", "except",
];

/// Validate a generated query and return it ready to execute.
///
/// Markdown code fences and a trailing semicolon are stripped. The query
/// must start with `SELECT`, contain exactly one statement, and read only
/// from `table`. String literals and comments are never inspected for
/// keywords.
pub fn validate_generated_query(raw: &str, table: &str) -> Result<String> {
    let sql = strip_code_fence(raw.trim());
    let sql = sql.trim().trim_end_matches(';').trim();

    if sql.is_empty() {
        return Err(invalid("empty query"));
    }

    if !starts_with_select(sql) {
        return Err(invalid("query must start with SELECT"));
    }

    let tokens = tokenize(sql)?;

    if tokens.contains(&Token::Semicolon) {
        return Err(invalid("multiple statements are not allowed"));
    }

    if tokens.iter().any(|t| t.is_keyword("join")) {
        return Err(invalid("joins are not allowed"));
    }

    check_from_targets(&tokens, table)?;

    Ok(sql.to_string())
}

/// Every `FROM` must name `table` or open a subquery, and no `FROM` clause
/// may list a second source after a comma.
fn check_from_targets(tokens: &[Token], table: &str) -> Result<()> {
    let mut depth = 0usize;
    // Depths of the FROM clauses still open, innermost last.
    let mut clauses: Vec<usize> = Vec::new();
    let mut expect_target = false;
    let mut reads_table = false;

    for token in tokens {
        if expect_target {
            expect_target = false;
            match token {
                Token::Open => {}
                Token::Word(name) | Token::Quoted(name) if name.eq_ignore_ascii_case(table) => {
                    reads_table = true;
                    continue;
                }
                Token::Word(name) | Token::Quoted(name) => {
                    return Err(invalid(format!("query reads from '{name}'")));
                }
                _ => return Err(invalid("FROM must name a table or a subquery")),
            }
        }

        let in_clause = clauses.last() == Some(&depth);
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                if in_clause {
                    clauses.pop();
                }
                depth = depth.saturating_sub(1);
            }
            Token::Comma if in_clause => {
                return Err(invalid("multiple tables are not allowed"));
            }
            t if t.is_keyword("from") => {
                if in_clause {
                    clauses.pop();
                }
                clauses.push(depth);
                expect_target = true;
            }
            Token::Word(word)
                if in_clause && FROM_CLAUSE_END.iter().any(|k| word.eq_ignore_ascii_case(k)) =>
            {
                clauses.pop();
            }
            _ => {}
        }
    }

    if expect_target || !reads_table {
        return Err(invalid(format!("query must read from '{table}'")));
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Token {
    /// Bare keyword or identifier.
    Word(String),
    /// `"name"`, `` `name` `` or `[name]`, unquoted.
    Quoted(String),
    /// A `'...'` string literal; its contents are irrelevant.
    Literal,
    Open,
    Close,
    Comma,
    Semicolon,
    Other,
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

fn tokenize(sql: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            ';' => tokens.push(Token::Semicolon),
            '\'' => {
                read_quoted(&mut chars, '\'')?;
                tokens.push(Token::Literal);
            }
            '"' | '`' => tokens.push(Token::Quoted(read_quoted(&mut chars, c)?)),
            '[' => tokens.push(Token::Quoted(read_quoted(&mut chars, ']')?)),
            '-' if chars.peek().is_some_and(|&(_, n)| n == '-') => {
                // Line comment.
                for (_, n) in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek().is_some_and(|&(_, n)| n == '*') => {
                chars.next();
                let mut prev = '\0';
                for (_, n) in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            c if is_word_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(idx, n)) = chars.peek() {
                    if !is_word_char(n) {
                        break;
                    }
                    end = idx + n.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Word(sql[start..end].to_string()));
            }
            _ => tokens.push(Token::Other),
        }
    }

    Ok(tokens)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Consume up to the closing `close` and return the unescaped contents.
/// A doubled closing quote is an escaped quote, except for `]`.
fn read_quoted(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    close: char,
) -> Result<String> {
    let mut out = String::new();
    while let Some((_, c)) = chars.next() {
        if c != close {
            out.push(c);
            continue;
        }
        if close != ']' && chars.peek().is_some_and(|&(_, n)| n == close) {
            chars.next();
            out.push(c);
            continue;
        }
        return Ok(out);
    }
    Err(invalid("unterminated quote"))
}

fn invalid(msg: impl Into<String>) -> MedSourceError {
    MedSourceError::InvalidQuery(msg.into())
}

/// Remove a surrounding ```` ```sql ... ``` ```` fence, if any.
fn strip_code_fence(s: &str) -> &str {
    let Some(body) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string ("sql") on the opening line.
    let body = match body.find('\n') {
        Some(idx) => &body[idx + 1..],
        None => body.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body)
}

fn starts_with_select(sql: &str) -> bool {
    let Some(head) = sql.get(..6) else {
        return false;
    };
    head.eq_ignore_ascii_case("select")
        && sql[6..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
}
