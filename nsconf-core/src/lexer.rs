use thiserror::Error;

/// One statement's worth of text after blank lines, comments and
/// continuations have been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the first physical line.
    pub number: usize,
    /// Statement text with continuation lines joined by a single space.
    pub text: String,
}

/// A single whitespace-delimited token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text exactly as written, quotes included.
    pub text: String,
    /// Whether the token opened with a quote or `q`-delimiter.
    pub quoted: bool,
}

impl Token {
    /// Flag tokens are unquoted, start with `-` and continue with a letter.
    ///
    /// `-1` and `-` on their own are values, not flags.
    pub fn is_flag(&self) -> bool {
        if self.quoted {
            return false;
        }
        let mut chars = self.text.chars();
        chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    }
}

/// Errors raised while splitting one line into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A quoted section was still open at end of line.
    #[error("unterminated {quote} quote starting at column {column}")]
    UnterminatedQuote { quote: char, column: usize },
}

/// Split raw configuration text into logical statement lines.
///
/// Blank lines and `#` comment lines are dropped. A physical line whose last
/// non-blank character is an unescaped `\` continues onto the next one.
pub fn logical_lines(text: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut pending: Option<LogicalLine> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let trimmed = line.trim();

        if pending.is_none() && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }

        let (body, continues) = split_continuation(trimmed);
        match &mut pending {
            Some(current) => {
                if !body.is_empty() {
                    current.text.push(' ');
                    current.text.push_str(body);
                }
            }
            None => {
                pending = Some(LogicalLine {
                    number: idx + 1,
                    text: body.to_string(),
                });
            }
        }

        if !continues {
            if let Some(done) = pending.take() {
                out.push(done);
            }
        }
    }

    if let Some(done) = pending.take() {
        out.push(done);
    }
    out
}

fn split_continuation(line: &str) -> (&str, bool) {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    if trailing % 2 == 1 {
        (line[..line.len() - 1].trim_end(), true)
    } else {
        (line, false)
    }
}

/// Split one logical line into tokens.
///
/// Single quotes, double quotes and the dialect's `q{...}` / `q|...|`
/// expression delimiters group whitespace into one token. Backslash escapes
/// the following character inside quotes. Quote characters are kept in the
/// token text.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let mut text = String::new();
        let quoted = is_quote(chars[i]) || q_delimiter(&chars, i).is_some();

        while i < chars.len() && !chars[i].is_whitespace() {
            if let Some(close) = q_delimiter(&chars, i).filter(|_| i == start) {
                text.push(chars[i]);
                text.push(chars[i + 1]);
                i = read_until(&chars, i + 2, close, &mut text).ok_or(
                    LexError::UnterminatedQuote {
                        quote: chars[start + 1],
                        column: start + 1,
                    },
                )?;
                continue;
            }
            if is_quote(chars[i]) {
                let quote = chars[i];
                let column = i + 1;
                text.push(quote);
                i = read_until(&chars, i + 1, quote, &mut text)
                    .ok_or(LexError::UnterminatedQuote { quote, column })?;
                continue;
            }
            text.push(chars[i]);
            i += 1;
        }

        tokens.push(Token { text, quoted });
    }

    Ok(tokens)
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

/// Closing character for a `q<delim>` expression opener at `i`.
fn q_delimiter(chars: &[char], i: usize) -> Option<char> {
    if chars.get(i) != Some(&'q') {
        return None;
    }
    if i > 0 && !chars[i - 1].is_whitespace() {
        return None;
    }
    match chars.get(i + 1)? {
        '{' => Some('}'),
        '<' => Some('>'),
        '[' => Some(']'),
        '(' => Some(')'),
        c @ ('/' | '|' | '~' | '$' | '^' | '+' | '=' | '&' | '%' | '@' | '`' | '?') => Some(*c),
        _ => None,
    }
}

/// Copy characters up to and including `close`, returning the index after it.
fn read_until(chars: &[char], mut i: usize, close: char, text: &mut String) -> Option<usize> {
    while i < chars.len() {
        let c = chars[i];
        text.push(c);
        if c == '\\' && close != '}' {
            if let Some(next) = chars.get(i + 1) {
                text.push(*next);
                i += 2;
                continue;
            }
        }
        if c == close {
            return Some(i + 1);
        }
        i += 1;
    }
    None
}
