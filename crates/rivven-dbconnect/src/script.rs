//! SQL script splitting
//!
//! Splits a multi-statement script on `;` while leaving semicolons inside quoted
//! strings, quoted identifiers and comments alone.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Split `sql` into statements, in order, without the terminating `;`.
///
/// Fragments holding nothing but whitespace and comments are dropped.
///
/// ```
/// use rivven_dbconnect::script::split_statements;
///
/// let statements = split_statements("CREATE TABLE t (a TEXT); INSERT INTO t VALUES ('x;y');").unwrap();
/// assert_eq!(statements, vec!["CREATE TABLE t (a TEXT)", "INSERT INTO t VALUES ('x;y')"]);
/// ```
pub fn split_statements(sql: &str) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;
    let mut state = State::Code;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::LineComment => {
                if ch == '\n' {
                    state = State::Code;
                }
                current.push(ch);
            }
            State::BlockComment => {
                current.push(ch);
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push('/');
                    state = State::Code;
                }
            }
            State::Quoted(close) => {
                current.push(ch);
                if ch == close {
                    // doubled quote stays inside the literal
                    if chars.peek() == Some(&close) {
                        chars.next();
                        current.push(close);
                    } else {
                        state = State::Code;
                    }
                }
            }
            State::Code => match ch {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    current.push_str("--");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    current.push_str("/*");
                    state = State::BlockComment;
                }
                ';' => {
                    if has_code {
                        statements.push(current.trim().to_string());
                    }
                    current.clear();
                    has_code = false;
                }
                '\'' | '"' | '`' | '[' => {
                    current.push(ch);
                    has_code = true;
                    state = State::Quoted(if ch == '[' { ']' } else { ch });
                }
                c => {
                    current.push(c);
                    if !c.is_whitespace() {
                        has_code = true;
                    }
                }
            },
        }
    }

    match state {
        State::Quoted(_) => {
            return Err(Error::config("unterminated quoted text in SQL script"));
        }
        State::BlockComment => {
            return Err(Error::config("unterminated block comment in SQL script"));
        }
        State::Code | State::LineComment => {}
    }

    if has_code {
        statements.push(current.trim().to_string());
    }
    Ok(statements)
}
