//! Per-invocation compile state shared by every pass.
//!
//! A fresh [`CompileContext`] is created by each `compile` call and dropped at
//! its end. Nothing here outlives a compile, so two compiles of the same input
//! always see the same registries.

use crate::diagnostics::{CompileError, Diagnostic};
use crate::parse::CompileOptions;
use oxc_span::Span;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// PROPS
// ═══════════════════════════════════════════════════════════════════════════════

/// How the component receives its props.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ParamForm {
    /// `({ a, b }) => ...`
    Destructured { names: Vec<String> },
    /// `(props) => ...`, renamed to the props object inside the body.
    WholeObject { param: String },
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropField {
    pub name: String,
    /// Printed default value from a `{ size = 10 }` pattern.
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropBinding {
    pub form: ParamForm,
    pub fields: Vec<PropField>,
}

impl Default for PropBinding {
    fn default() -> Self {
        PropBinding {
            form: ParamForm::None,
            fields: Vec::new(),
        }
    }
}

impl PropBinding {
    /// Adds a field unless one with the same name already exists.
    pub fn add_field(&mut self, name: &str, default: Option<String>) {
        if self.fields.iter().any(|f| f.name == name) {
            return;
        }
        self.fields.push(PropField {
            name: name.to_string(),
            default,
        });
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCell {
    pub value_name: String,
    pub setter_name: String,
    /// Printed initializer, `None` for `useState()`.
    pub initializer: Option<String>,
    /// Index of the replaced declaration in the component body.
    pub declaration: usize,
}

/// Setter name -> owning value name.
#[derive(Debug, Clone, Default)]
pub struct SetterRegistry {
    setters: HashMap<String, String>,
}

impl SetterRegistry {
    pub fn register(&mut self, setter: &str, value: &str) {
        self.setters.insert(setter.to_string(), value.to_string());
    }

    pub fn value_of(&self, setter: &str) -> Option<&str> {
        self.setters.get(setter).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.setters.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOWERED MARKUP
// ═══════════════════════════════════════════════════════════════════════════════

/// Pre-rendered block text standing in for a lowered `.map`, ternary or `&&`.
///
/// In the tree a raw block is an identifier produced by [`RawBlock::placeholder`];
/// the emitter swaps each `{placeholder}` for `text`.
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub text: String,
    /// Markup variables rendered as `{name}` holes inside `text`.
    pub references: Vec<String>,
}

const RAW_BLOCK_PREFIX: &str = "__RAW_BLOCK_";

impl RawBlock {
    pub fn placeholder(index: usize) -> String {
        format!("{}{}__", RAW_BLOCK_PREFIX, index)
    }

    pub fn index_of(name: &str) -> Option<usize> {
        name.strip_prefix(RAW_BLOCK_PREFIX)?
            .strip_suffix("__")?
            .parse()
            .ok()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectClass {
    MountOnly,
    UpdateOnDeps,
    UpdateAlways,
}

impl EffectClass {
    pub fn lifecycle_name(self) -> &'static str {
        match self {
            EffectClass::MountOnly => "onMount",
            EffectClass::UpdateOnDeps | EffectClass::UpdateAlways => "afterUpdate",
        }
    }
}

pub const DESTROY_LIFECYCLE: &str = "onDestroy";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

pub struct CompileContext<'s> {
    pub source: &'s str,
    pub options: &'s CompileOptions,
    pub props: PropBinding,
    pub state: Vec<StateCell>,
    pub setters: SetterRegistry,
    /// CompiledMarker set: body statement indices already rewritten into reactive form.
    pub compiled: HashSet<usize>,
    /// State declarations that must never be re-bound.
    pub exempt: HashSet<usize>,
    /// Names whose reads make a top-level statement reactive.
    pub tracked: HashSet<String>,
    /// Names bound to markup; fed to conditional lowering and the inliner.
    pub markup_names: HashSet<String>,
    pub raw_blocks: Vec<RawBlock>,
    /// Lifecycle names in first-use order.
    pub lifecycle_imports: Vec<&'static str>,
    /// Setters referenced by value, in first-reference order.
    pub synthesized_setters: Vec<String>,
}

impl<'s> CompileContext<'s> {
    pub fn new(source: &'s str, options: &'s CompileOptions) -> Self {
        CompileContext {
            source,
            options,
            props: PropBinding::default(),
            state: Vec::new(),
            setters: SetterRegistry::default(),
            compiled: HashSet::new(),
            exempt: HashSet::new(),
            tracked: HashSet::new(),
            markup_names: HashSet::new(),
            raw_blocks: Vec::new(),
            lifecycle_imports: Vec::new(),
            synthesized_setters: Vec::new(),
        }
    }

    pub fn use_lifecycle(&mut self, name: &'static str) {
        if !self.lifecycle_imports.contains(&name) {
            self.lifecycle_imports.push(name);
        }
    }

    pub fn push_raw_block(&mut self, text: String, references: Vec<String>) -> String {
        let index = self.raw_blocks.len();
        self.raw_blocks.push(RawBlock { text, references });
        RawBlock::placeholder(index)
    }

    pub fn synthesize_setter(&mut self, setter: &str) {
        if !self.synthesized_setters.iter().any(|s| s == setter) {
            self.synthesized_setters.push(setter.to_string());
        }
    }

    fn diagnostic(&self, code: &str, message: impl Into<String>, span: Span) -> Diagnostic {
        Diagnostic::new(code, message, span).located(
            self.source,
            self.options.filename.as_deref(),
            self.options.code_frames,
        )
    }

    pub fn structural(&self, code: &str, message: impl Into<String>, span: Span) -> CompileError {
        CompileError::Structural(self.diagnostic(code, message, span))
    }

    pub fn unsupported(&self, code: &str, message: impl Into<String>, span: Span) -> CompileError {
        CompileError::UnsupportedPattern(self.diagnostic(code, message, span))
    }
}
