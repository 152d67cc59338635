//! Compile pipeline.
//!
//! One call parses the module, runs every pass in order over a fresh
//! [`CompileContext`] and emits the result. Any error aborts the whole
//! compile; nothing partial is returned.

use oxc_allocator::Allocator;
use tracing::debug;

use crate::builder::AstFactory;
use crate::codegen::{emit, CompileResult};
use crate::context::CompileContext;
use crate::diagnostics::CompileError;
use crate::inline::inline_markup;
use crate::jsx_lowerer::lower_markup;
use crate::lifecycle::lower_hooks;
use crate::locate::locate_component;
use crate::parse::{parse_module, CompileOptions};
use crate::props::bind_props;
use crate::state::extract_state;
use crate::validate::validate_placement;

pub fn compile(source: &str, options: &CompileOptions) -> Result<CompileResult, CompileError> {
    let allocator = Allocator::default();
    let source = allocator.alloc_str(source);
    let mut program = parse_module(&allocator, source, options)?;
    let factory = AstFactory::new(&allocator, options.source_type());
    let mut ctx = CompileContext::new(source, options);

    let mut unit = locate_component(&mut program, &factory, &ctx)?;
    bind_props(&mut unit, &factory, &mut ctx)?;
    extract_state(&mut unit, &factory, &mut ctx)?;
    validate_placement(&program, &unit, &ctx)?;
    lower_markup(&mut program, &mut unit, &factory, &mut ctx)?;
    lower_hooks(&mut program, &mut unit, &factory, &mut ctx)?;
    inline_markup(&mut program, &mut unit, &factory, &mut ctx);
    let result = emit(&program, &unit, &factory, &ctx)?;

    debug!(
        file = options.filename.as_deref().unwrap_or("<input>"),
        props = result.props.len(),
        state = result.state.len(),
        raw_blocks = ctx.raw_blocks.len(),
        "compiled component"
    );
    Ok(result)
}

/// Compiles with default options and returns only the `.svelte` text.
pub fn compile_to_string(source: &str) -> Result<String, CompileError> {
    compile(source, &CompileOptions::default()).map(|result| result.code)
}
