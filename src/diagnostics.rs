//! Compile errors and source-framed diagnostics.
//!
//! Every pass fails fast: the first violation aborts the compile and is
//! surfaced as a [`CompileError`] carrying a [`Diagnostic`] with the span of
//! the offending node.

#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_PARSE: &str = "J2S-PARSE-001";
pub const ERR_NO_EXPORT: &str = "J2S-EXPORT-001";
pub const ERR_RETURN_SHAPE: &str = "J2S-EXPORT-002";
pub const ERR_MARKUP_IN_LOOP: &str = "J2S-MARKUP-001";
pub const ERR_MARKUP_IN_BRANCH: &str = "J2S-MARKUP-002";
pub const ERR_MARKUP_IN_FOREIGN_FUNCTION: &str = "J2S-MARKUP-003";
pub const ERR_EFFECT_CALLBACK: &str = "J2S-HOOK-001";
pub const ERR_EFFECT_CLEANUP: &str = "J2S-HOOK-002";
pub const ERR_EFFECT_PLACEMENT: &str = "J2S-HOOK-003";
pub const ERR_REDUCER: &str = "J2S-UNSUPPORTED-001";
pub const ERR_STATE_SHAPE: &str = "J2S-UNSUPPORTED-002";
pub const ERR_MEMO_ARGUMENT: &str = "J2S-UNSUPPORTED-003";
pub const ERR_INTERNAL_TEMPLATE: &str = "J2S-INTERNAL-001";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

/// The rule a diagnostic code enforces, phrased as what compiled output can rely on.
pub fn guarantee(code: &str) -> &'static str {
    match code {
        ERR_PARSE => "Input is a syntactically valid JSX module.",
        ERR_NO_EXPORT => "Every compiled module default-exports exactly one component function.",
        ERR_RETURN_SHAPE => "A component ends in a single return statement whose value is markup.",
        ERR_MARKUP_IN_LOOP => "Markup is never produced inside a loop; use `.map` in a markup hole.",
        ERR_MARKUP_IN_BRANCH => {
            "Markup is only branched through a ternary or `&&` placed directly in a markup hole."
        }
        ERR_MARKUP_IN_FOREIGN_FUNCTION => {
            "Markup only appears in the component itself or in a single-parameter `.map` callback."
        }
        ERR_EFFECT_CALLBACK => "Effect hooks receive an inline function expression.",
        ERR_EFFECT_CLEANUP => "Effect cleanups are returned as functions.",
        ERR_EFFECT_PLACEMENT => "Effect hooks are called as top-level statements of the component.",
        ERR_REDUCER => "Reducer-style state hooks are not compiled.",
        ERR_STATE_SHAPE => "State hooks are destructured into a [value, setter] pair at declaration.",
        ERR_MEMO_ARGUMENT => "Memoization hooks receive an inline function expression.",
        ERR_INTERNAL_TEMPLATE => "Generated code always parses.",
        _ => "Unknown rule.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: Option<String>,
    pub span_start: u32,
    pub span_end: u32,
    /// 1-based
    pub line: u32,
    /// 1-based, in characters
    pub column: u32,
    pub frame: Option<String>,
}

impl Diagnostic {
    pub fn new(code: &str, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            code: code.to_string(),
            message: message.into(),
            guarantee: guarantee(code).to_string(),
            file: None,
            span_start: span.start,
            span_end: span.end,
            line: 0,
            column: 0,
            frame: None,
        }
    }

    /// Resolves line/column against `source` and optionally renders a code frame.
    pub fn located(mut self, source: &str, file: Option<&str>, with_frame: bool) -> Self {
        let (line, column) = line_column(source, self.span_start);
        self.line = line;
        self.column = column;
        self.file = file.map(str::to_string);
        if with_frame {
            self.frame = Some(code_frame(
                source,
                Span::new(self.span_start, self.span_end),
                &self.message,
            ));
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        match &self.file {
            Some(file) => write!(f, " ({}:{}:{})", file, self.line, self.column)?,
            None if self.line > 0 => write!(f, " ({}:{})", self.line, self.column)?,
            None => {}
        }
        if let Some(frame) = &self.frame {
            write!(f, "\n{}", frame)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Parse error: {0}")]
    Parse(Diagnostic),
    #[error("Structural error: {0}")]
    Structural(Diagnostic),
    #[error("Unsupported pattern: {0}")]
    UnsupportedPattern(Diagnostic),
}

impl CompileError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            CompileError::Parse(d)
            | CompileError::Structural(d)
            | CompileError::UnsupportedPattern(d) => d,
        }
    }

    pub fn code(&self) -> &str {
        &self.diagnostic().code
    }

    pub fn message(&self) -> &str {
        &self.diagnostic().message
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, CompileError::Structural(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, CompileError::UnsupportedPattern(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE FRAMING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn line_column(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line as u32, column as u32)
}

/// Renders the lines around `span` with a gutter and a caret underline.
///
/// ```text
///   2 |   export default () => {
/// > 3 |     for (const x of xs) { <li/> }
///     |                           ^^^^^ markup inside a loop
///   4 |   };
/// ```
pub fn code_frame(source: &str, span: Span, message: &str) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let (line, column) = line_column(source, span.start);
    let line_idx = (line as usize).saturating_sub(1);
    let first = line_idx.saturating_sub(1);
    let last = (line_idx + 1).min(lines.len().saturating_sub(1));
    let gutter = (last + 1).to_string().len();

    let mut out = String::new();
    for (idx, text) in lines.iter().enumerate().take(last + 1).skip(first) {
        let marker = if idx == line_idx { '>' } else { ' ' };
        out.push_str(&format!("{} {:>width$} | {}\n", marker, idx + 1, text, width = gutter));
        if idx == line_idx {
            let remaining = text.chars().count().saturating_sub(column as usize - 1);
            let span_len = source
                .get(span.start as usize..span.end as usize)
                .map(|s| s.chars().take_while(|c| *c != '\n').count())
                .unwrap_or(1);
            let carets = span_len.clamp(1, remaining.max(1));
            out.push_str(&format!(
                "  {:>width$} | {}{} {}\n",
                "",
                " ".repeat(column as usize - 1),
                "^".repeat(carets),
                message,
                width = gutter
            ));
        }
    }
    out.trim_end().to_string()
}
