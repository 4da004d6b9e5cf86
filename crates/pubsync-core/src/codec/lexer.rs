//! Tokenizer for the corpus module's object-literal grammar.
//!
//! Handles the subset of JavaScript the corpus file actually uses: string
//! literals in any of the three quote styles, identifiers, numbers,
//! punctuation, and line/block comments. Anything else is a lex error.

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Semicolon,
    Eq,
    Str(String),
    Ident(String),
    Number(String),
}

pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                match chars.peek() {
                    Some('/') => {
                        while let Some(&c) = chars.peek() {
                            if c == '\n' {
                                break;
                            }
                            chars.next();
                        }
                    }
                    Some('*') => {
                        chars.next();
                        let mut prev = ' ';
                        loop {
                            match chars.next() {
                                Some('/') if prev == '*' => break,
                                Some(c) => {
                                    if c == '\n' {
                                        line += 1;
                                    }
                                    prev = c;
                                }
                                None => {
                                    return Err(SyncError::Parse(format!(
                                        "unterminated block comment at line {line}"
                                    )))
                                }
                            }
                        }
                    }
                    _ => {
                        return Err(SyncError::Parse(format!(
                            "unexpected '/' at line {line}"
                        )))
                    }
                }
            }
            '{' => {
                chars.next();
                tokens.push(Token::LBrace);
            }
            '}' => {
                chars.next();
                tokens.push(Token::RBrace);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semicolon);
            }
            '=' => {
                chars.next();
                // only plain assignment appears in the corpus module
                tokens.push(Token::Eq);
            }
            quote @ ('"' | '\'' | '`') => {
                chars.next();
                tokens.push(Token::Str(lex_string(&mut chars, quote, &mut line)?));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut number = String::new();
                number.push(c);
                chars.next();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '$' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(SyncError::Parse(format!(
                    "unexpected character {other:?} at line {line}"
                )))
            }
        }
    }

    Ok(tokens)
}

fn lex_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
    line: &mut usize,
) -> Result<String> {
    let mut out = String::new();
    loop {
        match chars.next() {
            None => {
                return Err(SyncError::Parse(format!(
                    "unterminated string at line {line}"
                )))
            }
            Some(c) if c == quote => return Ok(out),
            Some('\\') => match chars.next() {
                None => {
                    return Err(SyncError::Parse(format!(
                        "unterminated escape at line {line}"
                    )))
                }
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('f') => out.push('\u{000c}'),
                Some('v') => out.push('\u{000b}'),
                Some('0') => out.push('\0'),
                Some('u') => out.push(lex_unicode_escape(chars, *line)?),
                // \\, \", \', \` and any unrecognized escape fall through
                Some(escaped) => out.push(escaped),
            },
            Some('\n') => {
                *line += 1;
                out.push('\n');
            }
            Some(c) => out.push(c),
        }
    }
}

fn lex_unicode_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: usize,
) -> Result<char> {
    let mut hex = String::with_capacity(4);
    for _ in 0..4 {
        match chars.next() {
            Some(c) if c.is_ascii_hexdigit() => hex.push(c),
            _ => {
                return Err(SyncError::Parse(format!(
                    "malformed \\u escape at line {line}"
                )))
            }
        }
    }
    let code = u32::from_str_radix(&hex, 16)
        .map_err(|_| SyncError::Parse(format!("malformed \\u escape at line {line}")))?;
    char::from_u32(code)
        .ok_or_else(|| SyncError::Parse(format!("invalid \\u code point at line {line}")))
}
