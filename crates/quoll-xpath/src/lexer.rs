//! Tokenizer for query expressions.
//!
//! Splits an expression such as `//div[@class='note']/p[2]` into a flat
//! token stream with byte positions, so the parser can report where a
//! malformed expression went wrong.

use crate::error::QueryError;

/// A single lexical element of a query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A single `/` path separator.
    Slash,
    /// The `//` shorthand for a descendant-or-self step.
    DoubleSlash,
    /// The `@` attribute-axis shorthand.
    At,
    /// The `.` self step.
    Dot,
    /// The `..` parent step.
    DotDot,
    /// The `::` axis separator.
    ColonColon,
    /// Opening `[` of a predicate.
    OpenBracket,
    /// Closing `]` of a predicate.
    CloseBracket,
    /// Opening `(` of a node test or function call.
    OpenParen,
    /// Closing `)` of a node test or function call.
    CloseParen,
    /// The `*` wildcard node test.
    Star,
    /// The `=` comparison operator.
    Equal,
    /// The `!=` comparison operator.
    NotEqual,
    /// The `<` comparison operator.
    Less,
    /// The `<=` comparison operator.
    LessEqual,
    /// The `>` comparison operator.
    Greater,
    /// The `>=` comparison operator.
    GreaterEqual,
    /// The `-` operator, as in `last()-1`.
    Minus,
    /// An unsigned integer such as the `2` in `[2]`.
    Number(usize),
    /// A quoted string literal, quotes stripped.
    Literal(String),
    /// A name: an element or attribute name, an axis, or a function name.
    Name(String),
}

impl Token {
    /// Short human-readable description used in parse errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Token::Slash => "'/'".to_string(),
            Token::DoubleSlash => "'//'".to_string(),
            Token::At => "'@'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::DotDot => "'..'".to_string(),
            Token::ColonColon => "'::'".to_string(),
            Token::OpenBracket => "'['".to_string(),
            Token::CloseBracket => "']'".to_string(),
            Token::OpenParen => "'('".to_string(),
            Token::CloseParen => "')'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Equal => "'='".to_string(),
            Token::NotEqual => "'!='".to_string(),
            Token::Less => "'<'".to_string(),
            Token::LessEqual => "'<='".to_string(),
            Token::Greater => "'>'".to_string(),
            Token::GreaterEqual => "'>='".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Number(n) => format!("number {n}"),
            Token::Literal(s) => format!("literal '{s}'"),
            Token::Name(s) => format!("name '{s}'"),
        }
    }
}

/// True for characters that may continue a name token.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Tokenize a query expression into `(token, byte position)` pairs.
///
/// # Errors
///
/// Returns [`QueryError::Malformed`] for unterminated string literals,
/// a lone `!`, or any character outside the query grammar.
pub fn tokenize(text: &str) -> Result<Vec<(Token, usize)>, QueryError> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'/') {
                    tokens.push((Token::DoubleSlash, start));
                    i += 2;
                } else {
                    tokens.push((Token::Slash, start));
                    i += 1;
                }
            }
            b'@' => {
                tokens.push((Token::At, start));
                i += 1;
            }
            b'.' => {
                if bytes.get(i + 1) == Some(&b'.') {
                    tokens.push((Token::DotDot, start));
                    i += 2;
                } else {
                    tokens.push((Token::Dot, start));
                    i += 1;
                }
            }
            b':' => {
                if bytes.get(i + 1) == Some(&b':') {
                    tokens.push((Token::ColonColon, start));
                    i += 2;
                } else {
                    return Err(QueryError::malformed(start, "expected '::'"));
                }
            }
            b'[' => {
                tokens.push((Token::OpenBracket, start));
                i += 1;
            }
            b']' => {
                tokens.push((Token::CloseBracket, start));
                i += 1;
            }
            b'(' => {
                tokens.push((Token::OpenParen, start));
                i += 1;
            }
            b')' => {
                tokens.push((Token::CloseParen, start));
                i += 1;
            }
            b'*' => {
                tokens.push((Token::Star, start));
                i += 1;
            }
            b'=' => {
                tokens.push((Token::Equal, start));
                i += 1;
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::NotEqual, start));
                    i += 2;
                } else {
                    return Err(QueryError::malformed(start, "expected '!='"));
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::LessEqual, start));
                    i += 2;
                } else {
                    tokens.push((Token::Less, start));
                    i += 1;
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::GreaterEqual, start));
                    i += 2;
                } else {
                    tokens.push((Token::Greater, start));
                    i += 1;
                }
            }
            b'-' => {
                tokens.push((Token::Minus, start));
                i += 1;
            }
            b'\'' | b'"' => {
                let quote = c;
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != quote {
                    j += 1;
                }
                if j >= bytes.len() {
                    return Err(QueryError::malformed(start, "unterminated string literal"));
                }
                tokens.push((Token::Literal(text[i + 1..j].to_string()), start));
                i = j + 1;
            }
            b'0'..=b'9' => {
                let mut j = i;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                let value: usize = text[i..j]
                    .parse()
                    .map_err(|_| QueryError::malformed(start, "number out of range"))?;
                tokens.push((Token::Number(value), start));
                i = j;
            }
            _ if c.is_ascii_alphabetic() || c == b'_' => {
                let mut j = i;
                while j < bytes.len() && is_name_char(bytes[j] as char) {
                    j += 1;
                }
                tokens.push((Token::Name(text[i..j].to_string()), start));
                i = j;
            }
            _ => {
                return Err(QueryError::malformed(
                    start,
                    format!("unexpected character '{}'", text[start..].chars().next().unwrap_or('?')),
                ));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{tokenize, Token};

    #[test]
    fn path_with_predicate() {
        let tokens = tokenize("//div[@class='note']/p[2]").unwrap();
        let kinds: Vec<Token> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::DoubleSlash,
                Token::Name("div".to_string()),
                Token::OpenBracket,
                Token::At,
                Token::Name("class".to_string()),
                Token::Equal,
                Token::Literal("note".to_string()),
                Token::CloseBracket,
                Token::Slash,
                Token::Name("p".to_string()),
                Token::OpenBracket,
                Token::Number(2),
                Token::CloseBracket,
            ]
        );
    }

    #[test]
    fn positions_are_byte_offsets() {
        let tokens = tokenize("a/b").unwrap();
        assert_eq!(tokens[0].1, 0);
        assert_eq!(tokens[1].1, 1);
        assert_eq!(tokens[2].1, 2);
    }

    #[test]
    fn unterminated_literal_is_rejected() {
        assert!(tokenize("[@id='x]").is_err());
    }

    #[test]
    fn lone_bang_is_rejected() {
        assert!(tokenize("a!b").is_err());
    }
}
