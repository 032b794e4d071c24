//! Declaration patching
//!
//! Locates the one top-level declaration that refers to the relayed
//! directory and points it at a freshly built archive.

use tracing::warn;

use crate::archive::ContentHash;
use crate::document::{Document, Value};
use crate::error::RelayResult;

/// A recognised declaration: the called function and the attribute that
/// identifies which dependency it configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationShape {
    pub function: &'static str,
    pub key_attribute: &'static str,
}

impl DeclarationShape {
    /// `go_deps.archive_override(path = ...)` in `MODULE.bazel`
    pub const fn archive_override() -> Self {
        Self {
            function: "archive_override",
            key_attribute: "path",
        }
    }

    /// `http_archive(name = ...)` in `WORKSPACE`
    pub const fn http_archive() -> Self {
        Self {
            function: "http_archive",
            key_attribute: "name",
        }
    }
}

impl Default for DeclarationShape {
    fn default() -> Self {
        Self::archive_override()
    }
}

/// Rewrites attributes of the declaration whose key attribute equals `key`.
#[derive(Debug, Clone)]
pub struct DeclarationPatcher {
    shape: DeclarationShape,
    key: String,
}

impl DeclarationPatcher {
    pub fn new(shape: DeclarationShape, key: impl Into<String>) -> Self {
        Self {
            shape,
            key: key.into(),
        }
    }

    pub fn shape(&self) -> DeclarationShape {
        self.shape
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether `doc` holds a matching declaration.
    pub fn matches(&self, doc: &Document) -> bool {
        self.matching(doc).next().is_some()
    }

    /// Set each `(name, value)` on the first matching declaration.
    ///
    /// Returns `Ok(false)` and leaves `doc` untouched when nothing matches.
    pub fn update(&self, doc: &mut Document, values: &[(&str, Value)]) -> RelayResult<bool> {
        let found: Vec<usize> = self.matching(doc).collect();
        let Some(&index) = found.first() else {
            return Ok(false);
        };
        if found.len() > 1 {
            warn!(
                "{} declarations of {}({} = \"{}\") in {}; updating the first",
                found.len(),
                self.shape.function,
                self.shape.key_attribute,
                self.key,
                doc.name()
            );
        }

        for (name, value) in values {
            doc.set_call_attr(index, name, value)?;
        }
        Ok(true)
    }

    fn matching<'d>(&'d self, doc: &'d Document) -> impl Iterator<Item = usize> + 'd {
        doc.calls()
            .filter(|(_, call)| {
                call.function_name() == self.shape.function
                    && call.attr_string(self.shape.key_attribute) == Some(self.key.as_str())
            })
            .map(|(index, _)| index)
    }
}

/// Attributes that point a declaration at an archive served from `url`.
pub fn archive_attributes(hash: &ContentHash, url: &str) -> Vec<(&'static str, Value)> {
    vec![
        ("sha256", Value::String(hash.hex().to_string())),
        ("urls", Value::StringList(vec![url.to_string()])),
    ]
}
