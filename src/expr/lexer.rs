//! Tokenizer for rule expressions.
//!
//! Rules are plain infix conditions over part fields, for example
//! `outer_diameter > inner_diameter and weight > 0`.

use crate::expr::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    LParen,
    RParen,
}

impl Token {
    /// Short human label used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string {:?}", s),
            Token::Ident(name) => format!("name '{}'", name),
            Token::True => "'True'".to_string(),
            Token::False => "'False'".to_string(),
            Token::None => "'None'".to_string(),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::Not => "'not'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::DoubleStar => "'**'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::DoubleSlash => "'//'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Le => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::Ge => "'>='".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

/// A token plus the byte offset where it starts in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    let syntax = |offset: usize, message: String| ExprError::Syntax {
        expr: src.to_string(),
        offset,
        message,
    };

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            i = scan_number(bytes, i);
            let text = &src[start..i];
            let n: f64 = text
                .parse()
                .map_err(|_| syntax(start, format!("invalid number literal {:?}", text)))?;
            out.push(Spanned {
                token: Token::Number(n),
                offset: start,
            });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let token = match &src[start..i] {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "True" => Token::True,
                "False" => Token::False,
                "None" => Token::None,
                word => Token::Ident(word.to_string()),
            };
            out.push(Spanned {
                token,
                offset: start,
            });
            continue;
        }

        if c == b'\'' || c == b'"' {
            let (text, next) = scan_string(src, i)
                .ok_or_else(|| syntax(start, "unterminated string literal".to_string()))?;
            out.push(Spanned {
                token: Token::Str(text),
                offset: start,
            });
            i = next;
            continue;
        }

        let next = bytes.get(i + 1).copied();
        let (token, width) = match (c, next) {
            (b'*', Some(b'*')) => (Token::DoubleStar, 2),
            (b'/', Some(b'/')) => (Token::DoubleSlash, 2),
            (b'<', Some(b'=')) => (Token::Le, 2),
            (b'>', Some(b'=')) => (Token::Ge, 2),
            (b'=', Some(b'=')) => (Token::EqEq, 2),
            (b'!', Some(b'=')) => (Token::NotEq, 2),
            (b'&', Some(b'&')) => (Token::And, 2),
            (b'|', Some(b'|')) => (Token::Or, 2),
            (b'+', _) => (Token::Plus, 1),
            (b'-', _) => (Token::Minus, 1),
            (b'*', _) => (Token::Star, 1),
            (b'/', _) => (Token::Slash, 1),
            (b'%', _) => (Token::Percent, 1),
            (b'<', _) => (Token::Lt, 1),
            (b'>', _) => (Token::Gt, 1),
            (b'(', _) => (Token::LParen, 1),
            (b')', _) => (Token::RParen, 1),
            (b'=', _) => {
                return Err(syntax(
                    start,
                    "assignment '=' is not allowed, use '==' to compare".to_string(),
                ));
            }
            _ => {
                let ch = src[start..].chars().next().unwrap_or('?');
                return Err(syntax(start, format!("unexpected character {:?}", ch)));
            }
        };
        out.push(Spanned {
            token,
            offset: start,
        });
        i += width;
    }

    Ok(out)
}

/// Digits, optional fraction, optional exponent. Returns the end offset.
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Scan a quoted literal starting at `start`. Supports `\\`, `\'`, `\"`, `\n`, `\t`.
fn scan_string(src: &str, start: usize) -> Option<(String, usize)> {
    let mut chars = src[start..].char_indices();
    let (_, quote) = chars.next()?;
    let mut text = String::new();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars.next()?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            c if c == quote => return Some((text, start + idx + c.len_utf8())),
            c => text.push(c),
        }
    }
    None
}
