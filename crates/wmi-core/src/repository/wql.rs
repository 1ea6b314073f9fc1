//! WQL evaluation for the in-memory provider
//!
//! Supports the subset the repository needs:
//!
//! ```text
//! SELECT * | Prop [, Prop]* FROM Class [WHERE condition]
//!
//! condition := term (OR term)*
//! term      := factor (AND factor)*
//! factor    := NOT factor | '(' condition ')' | comparison
//! comparison:= Prop (= | <> | != | < | <= | > | >=) literal
//!            | literal (= | <> | != | < | <= | > | >=) Prop
//!            | Prop [NOT] LIKE 'pattern'
//!            | Prop IS [NOT] NULL
//! ```
//!
//! Keywords and property names are case-insensitive, and so are string
//! comparisons. A comparison involving null is false; `Prop = NULL` is read as
//! `Prop IS NULL`. `LIKE` understands `%`, `_` and `[...]` / `[^...]` sets.

use std::cmp::Ordering;

use logos::Logos;

use crate::error::{ProviderError, Status};
use crate::provider::ProviderResult;
use crate::value::Variant;

use super::{ObjectData, StoredValue};

// ============================================================================
// Tokens
// ============================================================================

#[derive(Logos, Debug, Clone, PartialEq)]
enum Token {
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#"'([^'\\]|\\.)*'"#, parse_string)]
    #[regex(r#""([^"\\]|\\.)*""#, parse_string)]
    Str(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i128>().ok())]
    Int(i128),

    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[token("*")]
    Star,

    #[token(",")]
    Comma,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("=")]
    Equal,

    #[token("<>")]
    #[token("!=")]
    NotEqual,

    #[token("<")]
    Less,

    #[token("<=")]
    LessEqual,

    #[token(">")]
    Greater,

    #[token(">=")]
    GreaterEqual,
}

fn parse_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(c) => result.push(c),
                None => break,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

fn invalid(detail: impl Into<String>) -> ProviderError {
    ProviderError::new(Status::INVALID_QUERY, detail)
}

fn tokenize(text: &str) -> ProviderResult<Vec<Token>> {
    let mut lexer = Token::lexer(text);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => {
                return Err(invalid(format!(
                    "unexpected '{}' at offset {}",
                    lexer.slice(),
                    lexer.span().start
                )))
            }
        }
    }
    Ok(tokens)
}

// ============================================================================
// Syntax tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn flip(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => other,
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        property: String,
        op: CompareOp,
        literal: Literal,
    },
    Like {
        property: String,
        pattern: LikePattern,
    },
    IsNull {
        property: String,
    },
}

impl Expr {
    fn properties<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.properties(out);
                b.properties(out);
            }
            Expr::Not(inner) => inner.properties(out),
            Expr::Compare { property, .. }
            | Expr::Like { property, .. }
            | Expr::IsNull { property } => out.push(property),
        }
    }

    fn eval(&self, object: &ObjectData) -> bool {
        let value = |name: &str| lookup(object, name);
        match self {
            Expr::And(a, b) => a.eval(object) && b.eval(object),
            Expr::Or(a, b) => a.eval(object) || b.eval(object),
            Expr::Not(inner) => !inner.eval(object),
            Expr::IsNull { property } => value(property.as_str()).is_null(),
            Expr::Like { property, pattern } => match value(property.as_str()) {
                Variant::String(s) => pattern.is_match(&s),
                _ => false,
            },
            Expr::Compare {
                property,
                op,
                literal,
            } => compare(&value(property.as_str()), literal).is_some_and(|ord| op.accepts(ord)),
        }
    }
}

fn lookup(object: &ObjectData, name: &str) -> StoredValue {
    object
        .property(name)
        .map(|slot| slot.value)
        .unwrap_or(Variant::Null)
}

/// Parsed `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Query {
    pub class: String,
    /// Selected properties; `None` for `*`
    pub fields: Option<Vec<String>>,
    pub filter: Option<Expr>,
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ProviderResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(invalid(format!("expected {}", keyword)))
        }
    }

    fn identifier(&mut self, what: &str) -> ProviderResult<String> {
        match self.advance() {
            Some(Token::Ident(name)) if !is_reserved(&name) => Ok(name),
            Some(other) => Err(invalid(format!("expected {}, found {:?}", what, other))),
            None => Err(invalid(format!("expected {}", what))),
        }
    }

    fn query(&mut self) -> ProviderResult<Query> {
        self.expect_keyword("SELECT")?;

        let fields = if self.peek() == Some(&Token::Star) {
            self.pos += 1;
            None
        } else {
            let mut fields = vec![self.identifier("property name")?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                fields.push(self.identifier("property name")?);
            }
            Some(fields)
        };

        self.expect_keyword("FROM")?;
        let class = self.identifier("class name")?;

        let filter = if self.eat_keyword("WHERE") {
            Some(self.or()?)
        } else {
            None
        };

        match self.peek() {
            None => Ok(Query {
                class,
                fields,
                filter,
            }),
            Some(token) => Err(invalid(format!("unexpected {:?}", token))),
        }
    }

    fn or(&mut self) -> ProviderResult<Expr> {
        let mut left = self.and()?;
        while self.eat_keyword("OR") {
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> ProviderResult<Expr> {
        let mut left = self.factor()?;
        while self.eat_keyword("AND") {
            let right = self.factor()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn factor(&mut self) -> ProviderResult<Expr> {
        if self.eat_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.factor()?)));
        }
        if self.peek() == Some(&Token::LeftParen) {
            self.pos += 1;
            let inner = self.or()?;
            if self.advance() != Some(Token::RightParen) {
                return Err(invalid("expected ')'"));
            }
            return Ok(inner);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ProviderResult<Expr> {
        if let Some(literal) = self.try_literal() {
            let op = self.operator()?;
            let property = self.identifier("property name")?;
            return Ok(compare_expr(property, op.flip(), literal));
        }

        let property = self.identifier("property name")?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            let test = Expr::IsNull { property };
            return Ok(if negated { Expr::Not(Box::new(test)) } else { test });
        }

        let negated = self.eat_keyword("NOT");
        if self.eat_keyword("LIKE") {
            let pattern = match self.advance() {
                Some(Token::Str(s)) => LikePattern::new(&s)?,
                _ => return Err(invalid("LIKE needs a string pattern")),
            };
            let test = Expr::Like { property, pattern };
            return Ok(if negated { Expr::Not(Box::new(test)) } else { test });
        }
        if negated {
            return Err(invalid("expected LIKE after NOT"));
        }

        let op = self.operator()?;
        let literal = self
            .try_literal()
            .ok_or_else(|| invalid(format!("expected a literal after '{}'", property)))?;
        Ok(compare_expr(property, op, literal))
    }

    fn operator(&mut self) -> ProviderResult<CompareOp> {
        let op = match self.advance() {
            Some(Token::Equal) => CompareOp::Eq,
            Some(Token::NotEqual) => CompareOp::Ne,
            Some(Token::Less) => CompareOp::Lt,
            Some(Token::LessEqual) => CompareOp::Le,
            Some(Token::Greater) => CompareOp::Gt,
            Some(Token::GreaterEqual) => CompareOp::Ge,
            Some(other) => return Err(invalid(format!("expected an operator, found {:?}", other))),
            None => return Err(invalid("expected an operator")),
        };
        Ok(op)
    }

    fn try_literal(&mut self) -> Option<Literal> {
        let literal = match self.peek()? {
            Token::Str(s) => Literal::Str(s.clone()),
            Token::Int(n) => Literal::Int(*n),
            Token::Float(f) => Literal::Float(*f),
            Token::Ident(s) if s.eq_ignore_ascii_case("NULL") => Literal::Null,
            Token::Ident(s) if s.eq_ignore_ascii_case("TRUE") => Literal::Bool(true),
            Token::Ident(s) if s.eq_ignore_ascii_case("FALSE") => Literal::Bool(false),
            _ => return None,
        };
        self.pos += 1;
        Some(literal)
    }
}

fn is_reserved(word: &str) -> bool {
    [
        "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "LIKE", "IS", "NULL", "TRUE", "FALSE",
    ]
    .iter()
    .any(|k| k.eq_ignore_ascii_case(word))
}

fn compare_expr(property: String, op: CompareOp, literal: Literal) -> Expr {
    match (op, literal) {
        (CompareOp::Eq, Literal::Null) => Expr::IsNull { property },
        (CompareOp::Ne, Literal::Null) => Expr::Not(Box::new(Expr::IsNull { property })),
        (op, literal) => Expr::Compare {
            property,
            op,
            literal,
        },
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn compare(value: &StoredValue, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (Variant::Null, _) | (_, Literal::Null) => None,
        (Variant::Bool(a), Literal::Bool(b)) => Some(a.cmp(b)),
        (Variant::Bool(a), Literal::Int(n)) => Some((*a as i128).cmp(n)),
        (Variant::String(s), Literal::Str(t)) => Some(s.to_lowercase().cmp(&t.to_lowercase())),
        (Variant::String(s), Literal::Int(n)) => s.trim().parse::<i128>().ok().map(|v| v.cmp(n)),
        (Variant::String(s), Literal::Float(f)) => {
            s.trim().parse::<f64>().ok().and_then(|v| v.partial_cmp(f))
        }
        (value, Literal::Int(n)) => match (value.integer(), value.float()) {
            (Some(v), _) => Some(v.cmp(n)),
            (None, Some(v)) => v.partial_cmp(&(*n as f64)),
            _ => None,
        },
        (value, Literal::Float(f)) => value
            .integer()
            .map(|v| v as f64)
            .or_else(|| value.float())
            .and_then(|v| v.partial_cmp(f)),
        (value, Literal::Str(s)) => {
            let s = s.trim();
            if let (Some(v), Ok(n)) = (value.integer(), s.parse::<i128>()) {
                Some(v.cmp(&n))
            } else if let (Some(v), Ok(f)) = (value.float(), s.parse::<f64>()) {
                v.partial_cmp(&f)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Compiled `LIKE` pattern.
///
/// `%` matches any run of characters and `_` exactly one. `[abc]`, `[a-f]`
/// and `[^...]` match one character from (or outside) a set. Matching ignores
/// case.
#[derive(Debug, Clone)]
pub(crate) struct LikePattern {
    source: String,
    compiled: regex::Regex,
}

impl LikePattern {
    pub(crate) fn new(pattern: &str) -> ProviderResult<Self> {
        let mut translated = String::from("(?is)\\A");
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => translated.push_str(".*"),
                '_' => translated.push('.'),
                '[' => translated.push_str(&char_set(&mut chars, pattern)?),
                c => translated.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        translated.push_str("\\z");

        let compiled = regex::Regex::new(&translated)
            .map_err(|e| invalid(format!("bad LIKE pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            compiled,
        })
    }

    pub(crate) fn is_match(&self, text: &str) -> bool {
        self.compiled.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Translate the body of a `[...]` set; the opening bracket is consumed.
fn char_set(chars: &mut std::str::Chars<'_>, pattern: &str) -> ProviderResult<String> {
    let mut body: Vec<char> = Vec::new();
    loop {
        match chars.next() {
            Some(']') => break,
            Some(c) => body.push(c),
            None => return Err(invalid(format!("unterminated '[' in LIKE pattern '{}'", pattern))),
        }
    }

    let (negated, members) = match body.split_first() {
        Some((&'^', rest)) => (true, rest),
        _ => (false, &body[..]),
    };
    if members.is_empty() {
        return Err(invalid(format!("empty set in LIKE pattern '{}'", pattern)));
    }

    let mut class = String::from(if negated { "[^" } else { "[" });
    for (i, &c) in members.iter().enumerate() {
        // '-' between two members is a range, anywhere else it is literal
        if c == '-' && i > 0 && i + 1 < members.len() {
            class.push('-');
        } else {
            class.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
        }
    }
    class.push(']');
    Ok(class)
}

impl Query {
    pub(crate) fn parse(text: &str) -> ProviderResult<Query> {
        let tokens = tokenize(text)?;
        Parser { tokens, pos: 0 }.query()
    }

    /// Check every referenced property exists on the class.
    pub(crate) fn validate(&self, class: &ObjectData) -> ProviderResult<()> {
        let mut referenced: Vec<&str> = Vec::new();
        if let Some(fields) = &self.fields {
            referenced.extend(fields.iter().map(String::as_str));
        }
        if let Some(filter) = &self.filter {
            filter.properties(&mut referenced);
        }

        for name in referenced {
            if class.property(name).is_err() {
                return Err(invalid(format!(
                    "'{}' is not a property of '{}'",
                    name,
                    class.class()
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn matches(&self, object: &ObjectData) -> bool {
        self.filter.as_ref().map_or(true, |f| f.eval(object))
    }

    /// Drop properties that were not selected. Keys are always kept.
    pub(crate) fn project(&self, mut object: ObjectData) -> ObjectData {
        if let Some(fields) = &self.fields {
            object.retain(|slot| {
                slot.key || fields.iter().any(|f| f.eq_ignore_ascii_case(&slot.name))
            });
        }
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ClassDef, Repository};
    use crate::value::{CimType, PropertyType};

    fn adapter(name: &str, index: u32, mac: Option<&str>) -> ObjectData {
        let repo = Repository::new();
        repo.add_class(
            "ROOT",
            ClassDef::new("Adapter")
                .key("DeviceID", PropertyType::scalar(CimType::String))
                .property("Name", PropertyType::scalar(CimType::String))
                .property("InterfaceIndex", PropertyType::scalar(CimType::Uint32))
                .property("MACAddress", PropertyType::scalar(CimType::String))
                .property("Enabled", PropertyType::scalar(CimType::Boolean)),
        )
        .unwrap();
        let mut object = repo.spawn("ROOT", "Adapter").unwrap();
        object.set("DeviceID", "0".into()).unwrap();
        object.set("Name", name.into()).unwrap();
        object.set("InterfaceIndex", index.into()).unwrap();
        object.set("Enabled", true.into()).unwrap();
        if let Some(mac) = mac {
            object.set("MACAddress", mac.into()).unwrap();
        }
        object
    }

    fn eval(query: &str, object: &ObjectData) -> bool {
        let query = Query::parse(query).unwrap();
        query.validate(object).unwrap();
        query.matches(object)
    }

    #[test]
    fn test_parse_select_list() {
        let query = Query::parse("select Name, InterfaceIndex from Win32_NetworkAdapter").unwrap();
        assert_eq!(query.class, "Win32_NetworkAdapter");
        assert_eq!(
            query.fields,
            Some(vec!["Name".to_string(), "InterfaceIndex".to_string()])
        );
        assert!(query.filter.is_none());
    }

    #[test]
    fn test_parse_errors() {
        for text in [
            "",
            "SELEC * FROM X",
            "SELECT FROM X",
            "SELECT * X",
            "SELECT * FROM",
            "SELECT * FROM X WHERE",
            "SELECT * FROM X WHERE A =",
            "SELECT * FROM X WHERE (A = 1",
            "SELECT * FROM X WHERE A = 1 junk",
            "SELECT * FROM X WHERE A # 1",
        ] {
            let err = Query::parse(text).unwrap_err();
            assert_eq!(err.status, Status::INVALID_QUERY, "{}", text);
        }
    }

    #[test]
    fn test_comparisons() {
        let a = adapter("Intel Ethernet", 7, Some("8C:16:45:2A:3B:4C"));
        assert!(eval("SELECT * FROM Adapter WHERE InterfaceIndex = 7", &a));
        assert!(eval("SELECT * FROM Adapter WHERE InterfaceIndex >= 7", &a));
        assert!(eval("SELECT * FROM Adapter WHERE 10 > InterfaceIndex", &a));
        assert!(!eval("SELECT * FROM Adapter WHERE InterfaceIndex <> 7", &a));
        assert!(eval("SELECT * FROM Adapter WHERE name = 'intel ethernet'", &a));
        assert!(eval("SELECT * FROM Adapter WHERE Enabled = TRUE", &a));
        assert!(eval("SELECT * FROM Adapter WHERE DeviceID = 0", &a));
    }

    #[test]
    fn test_null_handling() {
        let a = adapter("Loopback", 1, None);
        assert!(eval("SELECT * FROM Adapter WHERE MACAddress IS NULL", &a));
        assert!(eval("SELECT * FROM Adapter WHERE MACAddress = NULL", &a));
        assert!(!eval("SELECT * FROM Adapter WHERE MACAddress IS NOT NULL", &a));
        assert!(!eval("SELECT * FROM Adapter WHERE MACAddress = 'x'", &a));
        assert!(!eval("SELECT * FROM Adapter WHERE MACAddress <> 'x'", &a));
    }

    #[test]
    fn test_boolean_logic() {
        let a = adapter("Intel Ethernet", 7, None);
        assert!(eval(
            "SELECT * FROM Adapter WHERE (InterfaceIndex = 1 OR InterfaceIndex = 7) AND NOT Name = 'x'",
            &a
        ));
        assert!(!eval(
            "SELECT * FROM Adapter WHERE InterfaceIndex = 1 OR InterfaceIndex = 2 AND Name = 'Intel Ethernet'",
            &a
        ));
    }

    #[test]
    fn test_like() {
        let like = |text: &str, pattern: &str| LikePattern::new(pattern).unwrap().is_match(text);
        assert!(like("Intel Ethernet", "intel%"));
        assert!(like("intel ethernet", "%ETHER%"));
        assert!(like("abc", "a_c"));
        assert!(!like("abc", "a_"));
        assert!(like("", "%"));
        assert!(!like("abc", ""));
        assert!(like("a.c", "a.c"));
        assert!(!like("abc", "a.c"));
        assert!(like("line\nbreak", "line%"));

        let a = adapter("Intel Ethernet", 7, None);
        assert!(eval("SELECT * FROM Adapter WHERE Name LIKE 'INTEL%'", &a));
        assert!(eval("SELECT * FROM Adapter WHERE Name NOT LIKE '%wifi%'", &a));
    }

    #[test]
    fn test_like_sets() {
        let like = |text: &str, pattern: &str| LikePattern::new(pattern).unwrap().is_match(text);
        assert!(like("System", "[a-z]%"));
        assert!(like("explorer.exe", "[abcde]%"));
        assert!(!like("System", "[abcde]%"));
        assert!(like("eth1", "eth[0-9]"));
        assert!(!like("ethx", "eth[0-9]"));
        assert!(like("ethx", "eth[^0-9]"));
        assert!(!like("eth1", "eth[^0-9]"));
        assert!(like("100%", "100[%]"));
        assert!(like("a_b", "a[_]b"));
        assert!(!like("axb", "a[_]b"));
        assert!(like("a-", "a[a-]"));
        assert!(like("]", "]"));
        assert!(like("^", "[x^]"));

        let a = adapter("Intel Ethernet", 7, None);
        assert!(eval("SELECT * FROM Adapter WHERE Name LIKE '[h-j]ntel%'", &a));
        assert!(!eval("SELECT * FROM Adapter WHERE Name LIKE '[^i]%'", &a));
    }

    #[test]
    fn test_like_malformed_set() {
        for text in [
            "SELECT * FROM X WHERE Name LIKE 'eth[0-9'",
            "SELECT * FROM X WHERE Name LIKE '[]'",
            "SELECT * FROM X WHERE Name LIKE '[^]'",
            "SELECT * FROM X WHERE Name LIKE '[z-a]'",
        ] {
            let err = Query::parse(text).unwrap_err();
            assert_eq!(err.status, Status::INVALID_QUERY, "{}", text);
        }
    }

    #[test]
    fn test_validate_unknown_property() {
        let a = adapter("x", 1, None);
        let query = Query::parse("SELECT Speed FROM Adapter").unwrap();
        assert_eq!(query.validate(&a).unwrap_err().status, Status::INVALID_QUERY);

        let query = Query::parse("SELECT * FROM Adapter WHERE __CLASS = 'Adapter'").unwrap();
        assert!(query.validate(&a).is_ok());
        assert!(query.matches(&a));
    }

    #[test]
    fn test_projection_keeps_keys() {
        let a = adapter("x", 1, None);
        let query = Query::parse("SELECT Name FROM Adapter").unwrap();
        let projected = query.project(a);
        let names: Vec<&str> = projected.slots().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["DeviceID", "Name"]);
        assert!(projected.relative_path().is_some());
    }
}
