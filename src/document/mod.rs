//! Lossless model of Starlark-style build files
//!
//! `MODULE.bazel` and `WORKSPACE` files are parsed into a flat list of
//! top-level statements. Every node keeps byte spans into the original
//! source, and edits are applied as splices followed by a re-parse, so
//! formatting never rewrites regions that were not edited.

mod edit;
mod lexer;
mod parser;


use std::ops::Range;

use thiserror::Error;

/// A malformed document, positioned at the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(file: &str, line: usize, column: usize, message: &str) -> Self {
        Self {
            file: file.to_string(),
            line,
            column,
            message: message.to_string(),
        }
    }
}

/// An attribute or expression value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    StringList(Vec<String>),
    /// Any other expression, kept as its source text
    Other(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Value::StringList(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::StringList(items)
    }
}

/// One argument of a call, positional or named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Value,
    /// Source text between the name and the value, e.g. `" = "`
    pub separator: Option<String>,
    pub span: Range<usize>,
    pub value_span: Range<usize>,
}

/// A top-level call statement such as `go_deps.archive_override(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    /// Dotted callee, e.g. `go_deps.archive_override`
    pub callee: String,
    pub args: Vec<Arg>,
    pub span: Range<usize>,
    pub(crate) open_paren: usize,
    pub(crate) close_paren: usize,
    /// End offset of a comma following the last argument
    pub(crate) trailing_comma: Option<usize>,
    pub(crate) multiline: bool,
}

impl CallExpr {
    /// Final segment of the callee.
    pub fn function_name(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }

    /// First named argument called `name`.
    pub fn attr(&self, name: &str) -> Option<&Arg> {
        self.args.iter().find(|a| a.name.as_deref() == Some(name))
    }

    /// Value of a named argument when it is a plain string literal.
    pub fn attr_string(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(|a| a.value.as_str())
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Call(CallExpr),
    Assign {
        target: String,
        value: Value,
        span: Range<usize>,
    },
    /// A bare literal, e.g. a docstring
    Literal { value: Value, span: Range<usize> },
    /// Anything else: definitions, control flow, bare expressions
    Other { span: Range<usize> },
}

impl Stmt {
    pub fn span(&self) -> Range<usize> {
        match self {
            Stmt::Call(call) => call.span.clone(),
            Stmt::Assign { span, .. } | Stmt::Literal { span, .. } | Stmt::Other { span } => {
                span.clone()
            }
        }
    }

    pub fn as_call(&self) -> Option<&CallExpr> {
        match self {
            Stmt::Call(call) => Some(call),
            _ => None,
        }
    }
}

/// A parsed build file.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    source: String,
    statements: Vec<Stmt>,
}

impl Document {
    /// Parse `bytes` as a build file; `name` is used in error positions.
    pub fn parse(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ParseError> {
        let name = name.into();
        let source = match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(e) => {
                let valid = &bytes[..e.valid_up_to()];
                let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
                let column = valid.iter().rev().take_while(|&&b| b != b'\n').count() + 1;
                return Err(ParseError::new(&name, line, column, "invalid UTF-8"));
            }
        };
        let statements = parser::parse_statements(&name, &source)?;
        Ok(Self {
            name,
            source,
            statements,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn statements(&self) -> &[Stmt] {
        &self.statements
    }

    /// Top-level calls with their statement indices.
    pub fn calls(&self) -> impl Iterator<Item = (usize, &CallExpr)> {
        self.statements
            .iter()
            .enumerate()
            .filter_map(|(i, stmt)| stmt.as_call().map(|call| (i, call)))
    }

    /// Serialize the document. Unedited regions are byte-identical to the
    /// parsed input.
    pub fn format(&self) -> String {
        self.source.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Set the named attribute of the call at statement `stmt`, replacing
    /// its value or appending it after the last argument.
    pub fn set_call_attr(&mut self, stmt: usize, name: &str, value: &Value) -> Result<(), ParseError> {
        let call = match self.statements.get(stmt) {
            Some(Stmt::Call(call)) => call,
            other => {
                let offset = other.map_or(self.source.len(), |s| s.span().start);
                let (line, column) = lexer::LineIndex::new(&self.source).position(offset);
                return Err(ParseError::new(
                    &self.name,
                    line,
                    column,
                    &format!("statement {stmt} is not a call"),
                ));
            }
        };

        let (range, replacement) = edit::plan(&self.source, call, name, value);
        let mut source = String::with_capacity(self.source.len() + replacement.len());
        source.push_str(&self.source[..range.start]);
        source.push_str(&replacement);
        source.push_str(&self.source[range.end..]);

        self.statements = parser::parse_statements(&self.name, &source)?;
        self.source = source;
        Ok(())
    }
}
