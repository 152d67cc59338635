//! Parse Module
//!
//! Compile options and the entry into the oxc parser.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::{SourceType, Span};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{CompileError, Diagnostic, ERR_PARSE};

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Shown in diagnostics.
    pub filename: Option<String>,
    /// Module the lifecycle import is emitted from.
    pub runtime_module: String,
    /// Accept TypeScript syntax (`.tsx` input).
    pub typescript: bool,
    /// Attach a rendered code frame to every diagnostic.
    pub code_frames: bool,
    /// Prefix for each top-level script item.
    pub indent: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            filename: None,
            runtime_module: "svelte".to_string(),
            typescript: false,
            code_frames: true,
            indent: "  ".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn source_type(&self) -> SourceType {
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        if self.typescript {
            source_type.with_typescript(true)
        } else {
            source_type
        }
    }

    /// Infers `typescript` from a `.ts`/`.tsx` filename.
    pub fn for_file(filename: &str) -> Self {
        CompileOptions {
            filename: Some(filename.to_string()),
            typescript: filename.ends_with(".tsx") || filename.ends_with(".ts"),
            ..CompileOptions::default()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn parse_options() -> ParseOptions {
    ParseOptions {
        preserve_parens: false,
        ..ParseOptions::default()
    }
}

/// Parses one module. Only the first parser error is reported; it carries no span.
pub fn parse_module<'a>(
    allocator: &'a Allocator,
    source: &'a str,
    options: &CompileOptions,
) -> Result<Program<'a>, CompileError> {
    let ret = Parser::new(allocator, source, options.source_type())
        .with_options(parse_options())
        .parse();

    if let Some(error) = ret.errors.first() {
        let mut diagnostic = Diagnostic::new(ERR_PARSE, error.to_string(), Span::default());
        diagnostic.file = options.filename.clone();
        return Err(CompileError::Parse(diagnostic));
    }

    Ok(ret.program)
}
