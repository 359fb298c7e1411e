use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::vocabulary::AttributeKind;
use crate::model::ResourceKind;

/// 1-based line and column of a byte in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceSpan {
    Point { at: SourceLocation },
    Range {
        start: SourceLocation,
        end: SourceLocation,
    },
}

impl SourceSpan {
    pub fn point(at: SourceLocation) -> Self {
        Self::Point { at }
    }

    /// A span covering at most one character collapses to a point.
    pub fn between(start: SourceLocation, end: SourceLocation) -> Self {
        if start.line == end.line && end.column.saturating_sub(start.column) <= 1 {
            Self::Point { at: start }
        } else {
            Self::Range { start, end }
        }
    }

    pub fn start(&self) -> SourceLocation {
        match self {
            Self::Point { at } => *at,
            Self::Range { start, .. } => *start,
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point { at } => write!(f, "({at})"),
            Self::Range { start, end } => write!(f, "({start},{end})"),
        }
    }
}

/// A fatal error while parsing a bindless source file.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{file}{span}: {kind}")]
pub struct ParseError {
    pub file: String,
    pub span: SourceSpan,
    pub kind: ParseErrorKind,
}

/// Where an unrecognized word was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordPosition {
    Attribute,
    AttributeArgument,
    SamplerPreset,
    SamplerField,
    EnumValue,
}

impl fmt::Display for KeywordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attribute => "attribute",
            Self::AttributeArgument => "attribute argument",
            Self::SamplerPreset => "sampler preset",
            Self::SamplerField => "sampler field",
            Self::EnumValue => "value",
        };
        f.write_str(name)
    }
}

/// The declaration an attribute was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Resource(ResourceKind),
    Function,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(kind) => write!(f, "resource of type '{kind}'"),
            Self::Function => f.write_str("function"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("unknown {position} '{word}'")]
    UnknownKeyword {
        word: String,
        position: KeywordPosition,
    },

    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("expected {expected}")]
    Expected { expected: &'static str },

    #[error("bind group '{0}' is already declared")]
    DuplicateBindGroup(String),

    #[error("bind group '{0}' is used before being declared with #pragma bindgroup")]
    UndeclaredBindGroup(String),

    #[error("#pragma path is already set to '{0}'")]
    PathAlreadySet(String),

    #[error("#pragma path may only appear in the root source file")]
    PathOutsideSource,

    #[error("attribute '{attribute}' is not valid on {target}")]
    InvalidAttribute {
        attribute: AttributeKind,
        target: TargetKind,
    },

    #[error("attribute '{attribute}' is missing argument '{argument}'")]
    MissingArgument {
        attribute: AttributeKind,
        argument: &'static str,
    },

    #[error("attribute '{0}' does not take arguments")]
    UnexpectedArguments(AttributeKind),

    #[error("argument '{0}' is given more than once")]
    DuplicateArgument(String),

    #[error("sampler field '{0}' is missing '='")]
    MissingSamplerValue(String),

    #[error("'{value}' is not a valid value for '{name}'")]
    InvalidValue { name: String, value: String },

    #[error("attributes {0:?} are not attached to any declaration")]
    UnresolvedAttributes(Vec<AttributeKind>),

    #[error("struct '{0}' is already defined")]
    DuplicateStruct(String),

    #[error("user constants need {size} bytes which exceeds the {budget} byte push constant budget")]
    ConstantsOverflow { size: u32, budget: u32 },

    #[error("constants struct '{0}' is defined in an include and would be emitted twice")]
    ConstantsStructInInclude(String),

    #[error("could not find include '{0}' within the search directories")]
    IncludeNotFound(String),

    #[error("include '{path}' exceeds the maximum include depth of {limit}")]
    IncludeDepthExceeded { path: String, limit: usize },

    #[error("failed to read include '{path}': {message}")]
    Io { path: String, message: String },

    #[error("failed to render the bindless preamble: {0}")]
    Template(String),
}
