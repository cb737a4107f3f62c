//! Safety policy for generated SQL.
//!
//! A statement passes only if it is a single statement, starts with
//! `SELECT`, and contains none of the destructive keywords as a bare token.
//! Quoted text (string literals, quoted identifiers) and comments are not
//! scanned for keywords, so `WHERE title LIKE '%drop%'` is fine.

use thiserror::Error;

pub const FORBIDDEN_KEYWORDS: [&str; 9] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "TRUNCATE", "CREATE", "REPLACE", "GRANT",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("The generated query was empty.")]
    Empty,
    #[error("Only search queries are allowed.")]
    NotSelect,
    #[error("Security Block: Keyword '{0}' is not allowed.")]
    ForbiddenKeyword(String),
    #[error("Security Block: Multiple statements are not allowed.")]
    MultipleStatements,
}

/// A statement that passed [`validate`]. The catalog only executes these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSql(String);

impl ValidatedSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ValidatedSql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate(sql: &str) -> Result<ValidatedSql, Rejection> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }

    let scan = scan(trimmed);

    if let Some(keyword) = scan
        .words
        .iter()
        .find_map(|word| FORBIDDEN_KEYWORDS.iter().find(|k| word.eq_ignore_ascii_case(k)))
    {
        return Err(Rejection::ForbiddenKeyword(keyword.to_string()));
    }

    if scan.trailing_statement {
        return Err(Rejection::MultipleStatements);
    }

    let starts_with_select = trimmed
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"));
    let first_word_is_select = scan
        .words
        .first()
        .is_some_and(|w| w.eq_ignore_ascii_case("SELECT"));
    if !starts_with_select || !first_word_is_select {
        return Err(Rejection::NotSelect);
    }

    let statement = match scan.terminator {
        Some(idx) => trimmed[..idx].trim_end(),
        None => trimmed,
    };
    Ok(ValidatedSql(statement.to_string()))
}

struct Scan {
    /// Bare words outside quotes and comments, in order.
    words: Vec<String>,
    /// Byte offset of the first top-level `;`.
    terminator: Option<usize>,
    /// Anything other than whitespace or comments after the terminator.
    trailing_statement: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum State {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

fn scan(sql: &str) -> Scan {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut terminator = None;
    let mut trailing_statement = false;
    let mut state = State::Code;
    let mut chars = sql.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        match state {
            State::Code => {
                if c.is_alphanumeric() || c == '_' {
                    current.push(c);
                } else if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }

                match (c, next) {
                    ('-', Some('-')) => {
                        chars.next();
                        state = State::LineComment;
                    }
                    ('/', Some('*')) => {
                        chars.next();
                        state = State::BlockComment;
                    }
                    (';', _) => {
                        terminator.get_or_insert(offset);
                    }
                    _ if c.is_whitespace() => {}
                    _ => {
                        if terminator.is_some() {
                            trailing_statement = true;
                        }
                        match c {
                            '\'' | '"' | '`' => state = State::Quoted(c),
                            '[' => state = State::Quoted(']'),
                            _ => {}
                        }
                    }
                }
            }
            State::Quoted(close) => {
                if c == close {
                    // Doubled quote is an escaped quote inside the literal.
                    if next == Some(close) && close != ']' {
                        chars.next();
                    } else {
                        state = State::Code;
                    }
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }

    if !current.is_empty() {
        words.push(current);
    }

    Scan {
        words,
        terminator,
        trailing_statement,
    }
}
