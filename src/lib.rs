//! # jsx2svelte
//!
//! Compiles a module whose default export is a hook-based JSX component into
//! a Svelte single-file component.
//!
//! ## Pass order
//!
//! 1. **Locate** the default-exported component and lift its body out of the module.
//! 2. **Props**: derive prop names from the parameter; statements reading them become `$:`.
//! 3. **State**: `useState` pairs become `let` cells, setter calls become assignments.
//! 4. **Validate** markup placement (no markup in loops, `if` bodies or helper functions).
//! 5. **Lower** attributes, `.map` lists and hole conditionals into `{#each}` / `{#if}` blocks.
//! 6. **Hooks**: effects become lifecycle calls, memo hooks collapse to their values.
//! 7. **Inline** markup variables into holes and the return.
//! 8. **Emit** `<script>` and markup.
//!
//! Every call gets its own arena and [`context::CompileContext`]; compiles share no state.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod builder;
mod codegen;
mod compile;
mod context;
mod diagnostics;
mod inline;
mod jsx_lowerer;
mod lifecycle;
mod locate;
mod parse;
mod props;
mod reactive;
mod state;
mod syntax;
mod validate;

#[cfg(test)]
mod component_tests;
#[cfg(test)]
mod safety_tests;

pub use codegen::CompileResult;
pub use compile::{compile, compile_to_string};
pub use context::{EffectClass, ParamForm, PropField};
pub use diagnostics::{code_frame, guarantee, line_column, CompileError, Diagnostic};
pub use diagnostics::{
    ERR_EFFECT_CALLBACK, ERR_EFFECT_CLEANUP, ERR_EFFECT_PLACEMENT, ERR_INTERNAL_TEMPLATE,
    ERR_MARKUP_IN_BRANCH, ERR_MARKUP_IN_FOREIGN_FUNCTION, ERR_MARKUP_IN_LOOP, ERR_MEMO_ARGUMENT,
    ERR_NO_EXPORT, ERR_PARSE, ERR_REDUCER, ERR_RETURN_SHAPE, ERR_STATE_SHAPE,
};
pub use parse::CompileOptions;

/// Node entry point. `options_json` is a camelCase [`CompileOptions`] object;
/// the result is the JSON-encoded [`CompileResult`].
#[cfg(feature = "napi")]
#[napi]
pub fn compile_native(source: String, options_json: Option<String>) -> napi::Result<String> {
    let options = match options_json {
        Some(json) => serde_json::from_str::<CompileOptions>(&json)
            .map_err(|e| napi::Error::from_reason(e.to_string()))?,
        None => CompileOptions::default(),
    };
    let result = compile(&source, &options).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_string(&result).map_err(|e| napi::Error::from_reason(e.to_string()))
}
