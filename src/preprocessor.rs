//! Collects per-file metadata (declared bind groups and shader variants)
//! across a source file and everything it includes. Problems are reported to
//! a [`DiagnosticSink`] and never stop the scan.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use log::*;
use serde::{Deserialize, Serialize};

use crate::error::{SourceLocation, SourceSpan};
use crate::includes::IncludeProvider;
use crate::model::Vocabulary;
use crate::scanner::{Cursor, Quoted};
use crate::util::file_key;

/// Longest accepted variant identifier or display name.
pub const MAX_VARIANT_TEXT_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub span: SourceSpan,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[P/'{}':{}]: {}", self.file, self.span, self.message)
    }
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Reports diagnostics through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        error!("{diagnostic}");
    }
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariantKind {
    Toggle,
}

impl Vocabulary for VariantKind {
    const KEYWORDS: &'static [(&'static str, Self)] = &[("toggle", Self::Toggle)];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderVariant {
    pub kind: VariantKind,
    /// lower-cased
    pub identifier: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub bind_groups: BTreeSet<String>,
    pub variants: Vec<ShaderVariant>,
}

/// Metadata keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessorResult {
    pub files: BTreeMap<String, FileMetadata>,
}

impl PreprocessorResult {
    pub fn merge(&mut self, other: PreprocessorResult) {
        self.files.extend(other.files);
    }

    /// Every bind group declared in any processed file.
    pub fn bind_groups(&self) -> BTreeSet<&str> {
        self.files
            .values()
            .flat_map(|file| file.bind_groups.iter().map(String::as_str))
            .collect()
    }

    pub fn variants(&self) -> impl Iterator<Item = &ShaderVariant> {
        self.files.values().flat_map(|file| file.variants.iter())
    }
}

struct Inspection<'a> {
    includes: &'a dyn IncludeProvider,
    sink: &'a mut dyn DiagnosticSink,
    processed: HashSet<String>,
    result: PreprocessorResult,
}

/// Scans `source` and every file it includes, each file at most once.
pub fn inspect(
    file_name: &str,
    source: &str,
    includes: &dyn IncludeProvider,
    sink: &mut dyn DiagnosticSink,
) -> PreprocessorResult {
    let key = file_key(file_name);
    let mut inspection = Inspection {
        includes,
        sink,
        processed: HashSet::from([key.clone()]),
        result: PreprocessorResult::default(),
    };
    inspect_file(&mut inspection, &key, source);
    inspection.result
}

/// Scan state for a single file.
struct FileScan<'a> {
    file: &'a str,
    cursor: Cursor<'a>,
    metadata: FileMetadata,
}

impl FileScan<'_> {
    fn diagnostic(&self, start: SourceLocation, message: String) -> Diagnostic {
        Diagnostic {
            file: self.file.to_string(),
            span: SourceSpan::between(start, self.cursor.location()),
            message,
        }
    }
}

fn inspect_file(inspection: &mut Inspection<'_>, file: &str, source: &str) {
    let mut scan = FileScan {
        file,
        cursor: Cursor::new(source),
        metadata: FileMetadata::default(),
    };

    while let Some(byte) = scan.cursor.peek() {
        match byte {
            b'/' if scan.cursor.at_comment() => {
                scan.cursor.skip_comment();
            }
            b'#' => {
                inspect_directive(inspection, &mut scan);
                scan.cursor.skip_line();
            }
            _ => {
                scan.cursor.bump();
            }
        }
    }

    debug!(
        "preprocessed {file}: {} bind groups, {} variants",
        scan.metadata.bind_groups.len(),
        scan.metadata.variants.len()
    );
    inspection.result.files.insert(file.to_string(), scan.metadata);
}

fn inspect_directive(inspection: &mut Inspection<'_>, scan: &mut FileScan<'_>) {
    let start = scan.cursor.location();
    scan.cursor.bump();
    scan.cursor.skip_inline_whitespace();
    match scan.cursor.read_identifier() {
        "pragma" => {
            scan.cursor.skip_inline_whitespace();
            match scan.cursor.read_identifier() {
                "bindgroup" => inspect_bind_group(inspection, scan, start),
                "variant" => inspect_variant(inspection, scan, start),
                _ => {}
            }
        }
        "include" => inspect_include(inspection, scan, start),
        _ => {}
    }
}

fn is_printable(text: &str) -> bool {
    text.bytes().all(|byte| (32..=127).contains(&byte))
}

/// Reads a quoted string, reporting what is wrong with it when missing.
fn read_quoted<'a>(
    inspection: &mut Inspection<'_>,
    scan: &mut FileScan<'a>,
    start: SourceLocation,
    what: &str,
) -> Option<&'a str> {
    scan.cursor.skip_inline_whitespace();
    match scan.cursor.read_quoted() {
        Quoted::Text(text) => Some(text),
        Quoted::Missing => {
            let message = format!("Expected a quoted {what}");
            inspection.sink.report(scan.diagnostic(start, message));
            None
        }
        Quoted::Unterminated => {
            let message = format!("Reading {what} ended before the closing quote");
            inspection.sink.report(scan.diagnostic(start, message));
            None
        }
    }
}

fn inspect_bind_group(inspection: &mut Inspection<'_>, scan: &mut FileScan<'_>, start: SourceLocation) {
    let Some(name) = read_quoted(inspection, scan, start, "bind group name") else {
        return;
    };
    if is_printable(name) {
        scan.metadata.bind_groups.insert(name.to_string());
    } else {
        let message = format!("Bind group '{name}' contains a character outside of the valid ascii range (32 - 127)");
        inspection.sink.report(scan.diagnostic(start, message));
    }
}

/// Checks the length and character range of a variant identifier or
/// display name.
fn check_variant_text(
    inspection: &mut Inspection<'_>,
    scan: &FileScan<'_>,
    start: SourceLocation,
    what: &str,
    text: &str,
) -> bool {
    let problem = if text.is_empty() {
        Some(format!("{what} for shader variant must be longer than 0 characters"))
    } else if text.len() > MAX_VARIANT_TEXT_LENGTH {
        Some(format!(
            "{what} for shader variant must be at most {MAX_VARIANT_TEXT_LENGTH} characters long"
        ))
    } else if !is_printable(text) {
        Some(format!(
            "{what} '{text}' for shader variant contains a character outside of the valid ascii range (32 - 127)"
        ))
    } else {
        None
    };

    match problem {
        Some(message) => {
            inspection.sink.report(scan.diagnostic(start, message));
            false
        }
        None => true,
    }
}

/// `#pragma variant <kind> "<identifier>" ["<display name>"]`
fn inspect_variant(inspection: &mut Inspection<'_>, scan: &mut FileScan<'_>, start: SourceLocation) {
    scan.cursor.skip_inline_whitespace();
    let kind_word = scan.cursor.read_identifier();
    let Some(kind) = VariantKind::from_keyword(&kind_word.to_ascii_lowercase()) else {
        let message = format!("Unknown variant type '{kind_word}' specified in pragma");
        inspection.sink.report(scan.diagnostic(start, message));
        return;
    };

    let Some(identifier) = read_quoted(inspection, scan, start, "variant identifier") else {
        return;
    };
    if !check_variant_text(inspection, scan, start, "Identifier text", identifier) {
        return;
    }
    let identifier = identifier.to_ascii_lowercase();
    if scan.metadata.variants.iter().any(|variant| variant.identifier == identifier) {
        let message = format!("Variant with identifier '{identifier}' already exists");
        inspection.sink.report(scan.diagnostic(start, message));
        return;
    }

    scan.cursor.skip_inline_whitespace();
    let has_display_name = scan.cursor.peek().is_some_and(|byte| byte != b'\n') && !scan.cursor.at_comment();
    let display_name = if has_display_name {
        let Some(display_name) = read_quoted(inspection, scan, start, "variant display name") else {
            return;
        };
        if !check_variant_text(inspection, scan, start, "Display name", display_name) {
            return;
        }
        Some(display_name.to_string())
    } else {
        None
    };

    scan.metadata.variants.push(ShaderVariant {
        kind,
        identifier,
        display_name,
    });
}

fn inspect_include(inspection: &mut Inspection<'_>, scan: &mut FileScan<'_>, start: SourceLocation) {
    let Some(path) = read_quoted(inspection, scan, start, "include path") else {
        return;
    };
    let key = file_key(path);
    if !inspection.processed.insert(key.clone()) {
        return;
    }

    match inspection.includes.load(path) {
        Ok(Some(file)) => inspect_file(inspection, &key, &file.source),
        Ok(None) => {
            let message = format!("Could not find include '{path}' file within provided search directories");
            inspection.sink.report(scan.diagnostic(start, message));
        }
        Err(err) => {
            let message = format!("Failed to read include '{path}': {err}");
            inspection.sink.report(scan.diagnostic(start, message));
        }
    }
}
