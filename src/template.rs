//! Template rendering.
//!
//! A template is a Turtle fragment with two kinds of substitution:
//!
//! - `{Column}` is replaced with the record's cell text for that column
//! - `{{ name(arg, key=value) }}` is replaced with the result of calling
//!   `name` from the [`FunctionRegistry`]
//!
//! Calls are parsed once, when the template is compiled. Inside a call a
//! `{Column}` argument is passed to the function as the cell text, and a
//! quoted argument may embed `{Column}` references. Cell text is never read
//! back as template syntax. Every substituted value is escaped for a quoted
//! Turtle string before the fragment is parsed against the resolved
//! prefixes. Blank node labels are renamed per record so they never collide
//! across records.

use indexmap::IndexMap;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{BlankNode, NamedOrBlankNode, Term, Triple};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::TemplateRenderError;
use crate::functions::{FunctionArgs, FunctionRegistry};
use crate::record::Record;
use crate::spec::PrefixMap;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Column(String),
    Call(Call),
}

/// A `name(args)` call compiled from the template.
#[derive(Debug, Clone, PartialEq)]
struct Call {
    name: String,
    positional: Vec<Argument>,
    named: IndexMap<String, Argument>,
}

#[derive(Debug, Clone, PartialEq)]
enum Argument {
    Literal(Value),
    /// `{Column}`, passed as the cell text.
    Column(String),
    /// Quoted string embedding `{Column}` references.
    Interpolated(Vec<Piece>),
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Column(String),
}

impl Argument {
    fn columns(&self) -> Vec<&str> {
        match self {
            Argument::Literal(_) => Vec::new(),
            Argument::Column(name) => vec![name.as_str()],
            Argument::Interpolated(pieces) => pieces
                .iter()
                .filter_map(|p| match p {
                    Piece::Column(name) => Some(name.as_str()),
                    Piece::Text(_) => None,
                })
                .collect(),
        }
    }

    fn resolve(&self, record: &Record) -> Result<Value, TemplateRenderError> {
        match self {
            Argument::Literal(value) => Ok(value.clone()),
            Argument::Column(name) => cell(record, name).map(|c| Value::String(c.to_string())),
            Argument::Interpolated(pieces) => {
                let mut text = String::new();
                for piece in pieces {
                    match piece {
                        Piece::Text(t) => text.push_str(t),
                        Piece::Column(name) => text.push_str(cell(record, name)?),
                    }
                }
                Ok(Value::String(text))
            }
        }
    }
}

impl Call {
    fn arguments(&self, record: &Record) -> Result<FunctionArgs, TemplateRenderError> {
        let mut args = FunctionArgs::new();
        for argument in &self.positional {
            args.positional.push(argument.resolve(record)?);
        }
        for (key, argument) in &self.named {
            args.named.insert(key.clone(), argument.resolve(record)?);
        }
        Ok(args)
    }
}

fn cell<'r>(record: &'r Record, name: &str) -> Result<&'r str, TemplateRenderError> {
    record
        .get(name)
        .ok_or_else(|| TemplateRenderError::UnknownColumn(name.to_string()))
}

/// Compiled template.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    segments: Vec<Segment>,
    header: String,
}

impl TemplateEngine {
    /// Compile `template`, binding `prefixes` for fragment parsing.
    ///
    /// # Errors
    /// Returns error if a `{Column}` placeholder or a `{{ ... }}` call is
    /// never closed, or a call is malformed
    pub fn new(template: &str, prefixes: &PrefixMap) -> Result<Self, TemplateRenderError> {
        Ok(Self {
            segments: compile(template)?,
            header: prefixes.turtle_header(),
        })
    }

    /// Column names referenced by placeholders and call arguments, in
    /// first-use order.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            let used = match segment {
                Segment::Text(_) => Vec::new(),
                Segment::Column(name) => vec![name.as_str()],
                Segment::Call(call) => call
                    .positional
                    .iter()
                    .chain(call.named.values())
                    .flat_map(Argument::columns)
                    .collect(),
            };
            for name in used {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute columns and call results, returning the fragment text.
    ///
    /// # Errors
    /// Returns error on an unknown column or a failed function
    pub fn substitute(
        &self,
        record: &Record,
        functions: &FunctionRegistry,
    ) -> Result<String, TemplateRenderError> {
        let mut text = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => text.push_str(t),
                Segment::Column(name) => text.push_str(&escape_cell(cell(record, name)?)),
                Segment::Call(call) => {
                    let args = call.arguments(record)?;
                    text.push_str(&escape_cell(&functions.call(&call.name, &args)?));
                }
            }
        }
        Ok(text)
    }

    /// Render the template for one record into statements.
    ///
    /// Statements with an empty literal object are dropped, then statements
    /// pointing at blank nodes without statements of their own are dropped
    /// until none remain.
    ///
    /// # Arguments
    ///
    /// * `record` - Record supplying `{Column}` values
    /// * `functions` - Registry `{{ ... }}` calls are dispatched through
    ///
    /// # Errors
    ///
    /// Returns error if substitution fails or the substituted text is not a
    /// valid Turtle fragment
    pub fn render(
        &self,
        record: &Record,
        functions: &FunctionRegistry,
    ) -> Result<Vec<Triple>, TemplateRenderError> {
        let rendered = self.substitute(record, functions)?;
        let document = format!("{}{}", self.header, rendered);

        let mut statements = Vec::new();
        for quad in RdfParser::from_format(RdfFormat::Turtle)
            .rename_blank_nodes()
            .for_slice(document.as_bytes())
        {
            let quad = quad.map_err(|e| TemplateRenderError::Parse {
                message: e.to_string(),
                rendered: rendered.clone(),
            })?;
            statements.push(Triple::from(quad));
        }
        Ok(prune_empty(statements))
    }
}

/// Split a template into text, column placeholder and call segments.
fn compile(template: &str) -> Result<Vec<Segment>, TemplateRenderError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        if !text.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text)));
        }

        if rest[open..].starts_with("{{") {
            let body = &rest[open + 2..];
            let Some(end) = body.find("}}") else {
                return Err(TemplateRenderError::UnterminatedCall(offset + open));
            };

            let mut parser = CallParser::new(body);
            let call = parser.call_expression().map_err(|message| {
                TemplateRenderError::MalformedCall {
                    expression: body[..end].trim().to_string(),
                    message,
                }
            })?;
            segments.push(Segment::Call(call));

            let consumed = open + 2 + parser.pos;
            offset += consumed;
            rest = &rest[consumed..];
            continue;
        }

        let after = &rest[open + 1..];
        let close = after
            .find(|c: char| c == '}' || c == '{' || c == '\n')
            .filter(|&i| after[i..].starts_with('}'))
            .ok_or(TemplateRenderError::UnterminatedPlaceholder(offset + open))?;
        segments.push(Segment::Column(after[..close].trim().to_string()));

        offset += open + close + 2;
        rest = &after[close + 1..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Escape text so it can sit inside a quoted Turtle string.
fn escape_cell(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

struct CallParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> CallParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.src[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        Some(&self.src[start..self.pos])
    }

    /// `ws* call ws* "}}"`
    fn call_expression(&mut self) -> Result<Call, String> {
        self.skip_ws();
        let call = self.call()?;
        self.skip_ws();
        if !self.eat("}}") {
            return Err("expected '}}' after call".to_string());
        }
        Ok(call)
    }

    fn call(&mut self) -> Result<Call, String> {
        let name = self
            .ident()
            .ok_or_else(|| "expected a function name".to_string())?
            .to_string();
        self.skip_ws();
        if !self.eat("(") {
            return Err(format!("expected '(' after '{}'", name));
        }

        let mut call = Call {
            name,
            positional: Vec::new(),
            named: IndexMap::new(),
        };
        self.skip_ws();
        if self.eat(")") {
            return Ok(call);
        }

        loop {
            self.skip_ws();
            let start = self.pos;
            let keyword = self.ident().and_then(|key| {
                self.skip_ws();
                if self.peek() == Some('=') {
                    self.bump();
                    Some(key.to_string())
                } else {
                    None
                }
            });
            if keyword.is_none() {
                self.pos = start;
            }

            self.skip_ws();
            let argument = self.argument()?;
            match keyword {
                Some(key) => {
                    call.named.insert(key, argument);
                }
                None if !call.named.is_empty() => {
                    return Err("positional argument after keyword argument".to_string());
                }
                None => call.positional.push(argument),
            }

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => break,
                Some(c) => return Err(format!("unexpected '{}' in arguments", c)),
                None => return Err("unterminated argument list".to_string()),
            }
        }
        Ok(call)
    }

    fn argument(&mut self) -> Result<Argument, String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                self.quoted(quote)
            }
            Some('{') => {
                self.bump();
                self.column().map(Argument::Column)
            }
            _ => self.bare().map(Argument::Literal),
        }
    }

    /// Column name up to the closing `}`, the opening brace already consumed.
    fn column(&mut self) -> Result<String, String> {
        let start = self.pos;
        loop {
            match self.bump() {
                Some('}') => break,
                Some('{' | '\n') | None => {
                    return Err("unterminated column reference".to_string())
                }
                Some(_) => {}
            }
        }
        let name = self.src[start..self.pos - 1].trim();
        if name.is_empty() {
            return Err("empty column reference".to_string());
        }
        Ok(name.to_string())
    }

    fn quoted(&mut self, quote: char) -> Result<Argument, String> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(other) => text.push(other),
                    None => return Err("unterminated string".to_string()),
                },
                Some('{') => {
                    let name = self.column()?;
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(Piece::Column(name));
                }
                Some(c) => text.push(c),
            }
        }

        if pieces.is_empty() {
            return Ok(Argument::Literal(Value::String(text)));
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Ok(Argument::Interpolated(pieces))
    }

    /// Unquoted literal: number, boolean, null, or bare text.
    fn bare(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| !matches!(c, ',' | ')' | '{')) {
            self.bump();
        }
        let word = self.src[start..self.pos].trim();
        if word.is_empty() {
            return Err("empty argument".to_string());
        }

        Ok(match word {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            _ => {
                if let Ok(i) = word.parse::<i64>() {
                    Value::from(i)
                } else if let Some(n) = word
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    Value::Number(n)
                } else {
                    Value::String(word.to_string())
                }
            }
        })
    }
}

/// Drop empty literals, then dangling blank-node objects, to a fixed point.
pub fn prune_empty(statements: Vec<Triple>) -> Vec<Triple> {
    let mut statements: Vec<Triple> = statements
        .into_iter()
        .filter(|t| !matches!(&t.object, Term::Literal(l) if l.value().is_empty()))
        .collect();

    loop {
        let described: HashSet<BlankNode> = statements
            .iter()
            .filter_map(|t| match &t.subject {
                NamedOrBlankNode::BlankNode(b) => Some(b.clone()),
                _ => None,
            })
            .collect();

        let before = statements.len();
        statements.retain(|t| match &t.object {
            Term::BlankNode(b) => described.contains(b),
            _ => true,
        });
        if statements.len() == before {
            return statements;
        }
    }
}
