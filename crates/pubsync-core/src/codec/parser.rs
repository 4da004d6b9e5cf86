//! Recursive-descent parser over the token stream: locates the
//! `publications` array and turns each object literal into a
//! [`Publication`].
//!
//! Recovery is per record: a malformed object is skipped with a warning and
//! the rest of the array still parses. Structural damage outside the array
//! (no `publications` binding, unbalanced brackets) is fatal.

use tracing::warn;

use crate::error::{Result, SyncError};
use crate::model::Publication;

use super::lexer::{tokenize, Token};

/// Value subset the corpus grammar allows.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Str(String),
    Number(String),
    Bool(bool),
    Null,
    Array(Vec<JsValue>),
    Object(Vec<(String, JsValue)>),
}

pub fn parse_corpus(input: &str) -> Result<Vec<Publication>> {
    let tokens = tokenize(input)?;
    let start = find_publications_array(&tokens)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: start,
    };
    parser.parse_publication_array()
}

/// Index of the token just after `publications = [`.
fn find_publications_array(tokens: &[Token]) -> Result<usize> {
    let mut i = 0;
    while i + 2 < tokens.len() {
        if matches!(&tokens[i], Token::Ident(name) if name == "publications")
            && tokens[i + 1] == Token::Eq
            && tokens[i + 2] == Token::LBracket
        {
            return Ok(i + 3);
        }
        i += 1;
    }
    Err(SyncError::Parse(
        "no `publications = [` binding found in corpus module".to_string(),
    ))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(SyncError::Parse(format!(
                "expected {expected:?}, found {token:?}"
            ))),
            None => Err(SyncError::Parse(format!(
                "expected {expected:?}, found end of input"
            ))),
        }
    }

    /// Parse records until the closing `]`. Called with `pos` just inside
    /// the array.
    fn parse_publication_array(&mut self) -> Result<Vec<Publication>> {
        let mut records = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBracket) => {
                    self.next();
                    return Ok(records);
                }
                Some(Token::Comma) => {
                    self.next();
                }
                Some(Token::LBrace) => {
                    let start = self.pos;
                    match self.parse_object().and_then(publication_from_fields) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            warn!(record = records.len(), error = %e, "skipping malformed corpus record");
                            self.pos = start;
                            self.skip_balanced_object()?;
                        }
                    }
                }
                Some(token) => {
                    return Err(SyncError::Parse(format!(
                        "unexpected {token:?} in publications array"
                    )))
                }
                None => {
                    return Err(SyncError::Parse(
                        "unterminated publications array".to_string(),
                    ))
                }
            }
        }
    }

    fn parse_value(&mut self) -> Result<JsValue> {
        match self.next() {
            Some(Token::Str(s)) => Ok(JsValue::Str(s.clone())),
            Some(Token::Number(n)) => Ok(JsValue::Number(n.clone())),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(JsValue::Bool(true)),
                "false" => Ok(JsValue::Bool(false)),
                "null" | "undefined" => Ok(JsValue::Null),
                other => Err(SyncError::Parse(format!(
                    "unexpected identifier {other:?} in value position"
                ))),
            },
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                loop {
                    match self.peek() {
                        Some(Token::RBracket) => {
                            self.next();
                            return Ok(JsValue::Array(items));
                        }
                        Some(Token::Comma) => {
                            self.next();
                        }
                        Some(_) => items.push(self.parse_value()?),
                        None => {
                            return Err(SyncError::Parse("unterminated array".to_string()))
                        }
                    }
                }
            }
            Some(Token::LBrace) => {
                self.pos -= 1;
                Ok(JsValue::Object(self.parse_object()?))
            }
            Some(token) => Err(SyncError::Parse(format!(
                "unexpected {token:?} in value position"
            ))),
            None => Err(SyncError::Parse(
                "unexpected end of input in value position".to_string(),
            )),
        }
    }

    /// `{ key: value, ... }` with bare-identifier or quoted keys and an
    /// optional trailing comma.
    fn parse_object(&mut self) -> Result<Vec<(String, JsValue)>> {
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        loop {
            match self.next() {
                Some(Token::RBrace) => return Ok(fields),
                Some(Token::Comma) => {}
                Some(Token::Ident(key)) => {
                    self.expect(&Token::Colon)?;
                    fields.push((key.clone(), self.parse_value()?));
                }
                Some(Token::Str(key)) => {
                    self.expect(&Token::Colon)?;
                    fields.push((key.clone(), self.parse_value()?));
                }
                Some(token) => {
                    return Err(SyncError::Parse(format!(
                        "unexpected {token:?} in object literal"
                    )))
                }
                None => return Err(SyncError::Parse("unterminated object".to_string())),
            }
        }
    }

    /// Advance past one object literal without interpreting it.
    fn skip_balanced_object(&mut self) -> Result<()> {
        self.expect(&Token::LBrace)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next() {
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => depth -= 1,
                Some(_) => {}
                None => {
                    return Err(SyncError::Parse(
                        "unterminated object while recovering".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }
}

fn publication_from_fields(fields: Vec<(String, JsValue)>) -> Result<Publication> {
    let mut record = Publication {
        id: String::new(),
        title: String::new(),
        authors: String::new(),
        journal: String::new(),
        year: String::new(),
        doi: None,
        url: None,
        abstract_text: None,
        projects: Vec::new(),
        tags: Vec::new(),
        featured: false,
        image_url: None,
        attention_grabber: None,
    };

    for (key, value) in fields {
        match key.as_str() {
            "id" => record.id = string_field(&key, value)?,
            "title" => record.title = string_field(&key, value)?,
            "authors" => record.authors = string_field(&key, value)?,
            "journal" => record.journal = string_field(&key, value)?,
            "year" => record.year = year_field(value)?,
            "doi" => record.doi = optional_string(&key, value)?,
            "url" => record.url = optional_string(&key, value)?,
            "abstract" => record.abstract_text = optional_string(&key, value)?,
            "projects" => record.projects = string_array(&key, value)?,
            "tags" => record.tags = string_array(&key, value)?,
            "featured" => match value {
                JsValue::Bool(b) => record.featured = b,
                other => {
                    return Err(SyncError::Parse(format!(
                        "featured must be a boolean, found {other:?}"
                    )))
                }
            },
            "imageUrl" => record.image_url = optional_string(&key, value)?,
            "attentionGrabber" => record.attention_grabber = optional_string(&key, value)?,
            // unknown keys from hand edits are tolerated and dropped
            _ => {}
        }
    }

    if record.id.is_empty() {
        return Err(SyncError::Parse("record missing id".to_string()));
    }
    if record.title.is_empty() {
        return Err(SyncError::Parse(format!(
            "record {} missing title",
            record.id
        )));
    }
    Ok(record)
}

fn string_field(key: &str, value: JsValue) -> Result<String> {
    match value {
        JsValue::Str(s) => Ok(s),
        JsValue::Number(n) => Ok(n),
        other => Err(SyncError::Parse(format!(
            "{key} must be a string, found {other:?}"
        ))),
    }
}

fn year_field(value: JsValue) -> Result<String> {
    match value {
        JsValue::Str(s) => Ok(s),
        JsValue::Number(n) => Ok(n),
        other => Err(SyncError::Parse(format!(
            "year must be a string or number, found {other:?}"
        ))),
    }
}

fn optional_string(key: &str, value: JsValue) -> Result<Option<String>> {
    match value {
        JsValue::Null => Ok(None),
        JsValue::Str(s) if s.is_empty() => Ok(None),
        JsValue::Str(s) => Ok(Some(s)),
        other => Err(SyncError::Parse(format!(
            "{key} must be a string or null, found {other:?}"
        ))),
    }
}

fn string_array(key: &str, value: JsValue) -> Result<Vec<String>> {
    match value {
        JsValue::Array(items) => items
            .into_iter()
            .map(|item| match item {
                JsValue::Str(s) => Ok(s),
                other => Err(SyncError::Parse(format!(
                    "{key} must contain only strings, found {other:?}"
                ))),
            })
            .collect(),
        other => Err(SyncError::Parse(format!(
            "{key} must be an array, found {other:?}"
        ))),
    }
}
