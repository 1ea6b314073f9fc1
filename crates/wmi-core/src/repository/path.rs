//! Object path parsing
//!
//! ```text
//! [\\server\namespace:]Class
//! [\\server\namespace:]Class=@
//! [\\server\namespace:]Class="value"
//! [\\server\namespace:]Class.Key1="value",Key2=42
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{ProviderError, Status};
use crate::provider::ProviderResult;
use crate::service::normalize_namespace;
use crate::value::Variant;

use super::StoredValue;

/// What an object path selects.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selector {
    /// The class definition
    Class,
    /// The singleton instance (`=@`)
    Singleton,
    /// An instance by key; a `None` name is the class's single key
    Keys(Vec<(Option<String>, StoredValue)>),
}

/// Parsed object path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ObjectPath {
    pub namespace: Option<String>,
    pub class: String,
    pub selector: Selector,
    text: String,
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn invalid(text: &str, detail: &str) -> ProviderError {
    ProviderError::new(
        Status::INVALID_OBJECT_PATH,
        format!("invalid object path '{}': {}", text, detail),
    )
}

impl ObjectPath {
    pub(crate) fn parse(text: &str) -> ProviderResult<ObjectPath> {
        let trimmed = text.trim();
        let (namespace, relative) = split_namespace(trimmed);
        let namespace = namespace.map(normalize_namespace);

        let mut cursor = Cursor {
            text: relative,
            chars: relative.char_indices().peekable(),
        };

        let class = cursor.ident();
        if class.is_empty() {
            return Err(invalid(text, "missing class name"));
        }

        let selector = match cursor.next() {
            None => Selector::Class,
            Some('=') => {
                if cursor.eat('@') {
                    Selector::Singleton
                } else {
                    let value = cursor.value().map_err(|d| invalid(text, &d))?;
                    Selector::Keys(vec![(None, value)])
                }
            }
            Some('.') => {
                let mut keys = Vec::new();
                loop {
                    let name = cursor.ident();
                    if name.is_empty() {
                        return Err(invalid(text, "missing key name"));
                    }
                    if !cursor.eat('=') {
                        return Err(invalid(text, "expected '=' after key name"));
                    }
                    let value = cursor.value().map_err(|d| invalid(text, &d))?;
                    keys.push((Some(name.to_string()), value));
                    if !cursor.eat(',') {
                        break;
                    }
                }
                Selector::Keys(keys)
            }
            Some(c) => return Err(invalid(text, &format!("unexpected '{}'", c))),
        };

        if let Some(c) = cursor.next() {
            return Err(invalid(text, &format!("trailing '{}'", c)));
        }

        Ok(ObjectPath {
            namespace,
            class: class.to_string(),
            selector,
            text: trimmed.to_string(),
        })
    }
}

/// Split `\\server\ns:rel` or `ns:rel` into namespace and relative path.
fn split_namespace(text: &str) -> (Option<&str>, &str) {
    let stripped = text
        .strip_prefix("\\\\")
        .or_else(|| text.strip_prefix("//"))
        .map(|rest| rest.find(['\\', '/']).map_or("", |i| &rest[i + 1..]));

    let candidate = stripped.unwrap_or(text);
    let boundary = candidate
        .find(['.', '=', '"'])
        .unwrap_or(candidate.len());
    match candidate[..boundary].find(':') {
        Some(colon) => (Some(&candidate[..colon]), &candidate[colon + 1..]),
        None => (None, candidate),
    }
}

struct Cursor<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().map(|(_, c)| *c) == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = match self.chars.peek() {
            Some((i, _)) => *i,
            None => return "",
        };
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        &self.text[start..end]
    }

    fn value(&mut self) -> Result<StoredValue, String> {
        if self.eat('"') {
            let mut out = String::new();
            loop {
                match self.next() {
                    Some('"') => return Ok(Variant::String(out)),
                    Some('\\') => match self.next() {
                        Some(c) => out.push(c),
                        None => return Err("unterminated escape".to_string()),
                    },
                    Some(c) => out.push(c),
                    None => return Err("unterminated string".to_string()),
                }
            }
        }

        let mut raw = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c == ',' {
                break;
            }
            raw.push(c);
            self.chars.next();
        }
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("TRUE") {
            return Ok(Variant::Bool(true));
        }
        if raw.eq_ignore_ascii_case("FALSE") {
            return Ok(Variant::Bool(false));
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Variant::I64(n));
        }
        if let Ok(n) = raw.parse::<u64>() {
            return Ok(Variant::U64(n));
        }
        if raw.is_empty() {
            Err("missing key value".to_string())
        } else {
            Err(format!("bad key value '{}'", raw))
        }
    }
}
