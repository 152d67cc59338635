//! Emitter
//!
//! Assembles the Svelte component text from the lowered module and component
//! body: a `<script>` section followed by the markup section.

#[cfg(feature = "napi")]
use napi_derive::napi;
use lazy_static::lazy_static;
use oxc_ast::ast::*;
use oxc_span::GetSpan;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::AstFactory;
use crate::context::CompileContext;
use crate::diagnostics::{CompileError, ERR_RETURN_SHAPE};
use crate::locate::ComponentUnit;
use crate::syntax::{is_jsx, FRAMEWORK_MODULE};

lazy_static! {
    static ref RAW_BLOCK_HOLE: Regex = Regex::new(r"\{__RAW_BLOCK_(\d+)__\}").unwrap();
    static ref FRAGMENT_TAG: Regex = Regex::new(r"</?(?:React\.)?Fragment>|</?>").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    /// The complete `.svelte` source.
    pub code: String,
    /// Top-level script items, unindented, in output order.
    pub script: Vec<String>,
    pub markup: String,
    pub props: Vec<String>,
    /// State value names in declaration order.
    pub state: Vec<String>,
    pub lifecycle_imports: Vec<String>,
    pub synthesized_setters: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT
// ═══════════════════════════════════════════════════════════════════════════════

fn lifecycle_import(ctx: &CompileContext) -> Option<String> {
    if ctx.lifecycle_imports.is_empty() {
        return None;
    }
    Some(format!(
        "import {{ {} }} from \"{}\";",
        ctx.lifecycle_imports.join(", "),
        ctx.options.runtime_module
    ))
}

/// Module statements that survive into the script, with `export` stripped
/// from named declarations.
fn module_item<'a>(stmt: &Statement<'a>, factory: &AstFactory<'a>) -> Option<String> {
    match stmt {
        Statement::ImportDeclaration(import) if import.source.value.as_str() == FRAMEWORK_MODULE => {
            None
        }
        Statement::ExportNamedDeclaration(export) if export.declaration.is_none() => None,
        Statement::ExportNamedDeclaration(_) => {
            let printed = factory.print_statement(stmt);
            Some(
                printed
                    .strip_prefix("export ")
                    .map(str::to_string)
                    .unwrap_or(printed),
            )
        }
        Statement::ExportAllDeclaration(_) | Statement::ExportDefaultDeclaration(_) => None,
        other => Some(factory.print_statement(other)),
    }
}

fn prop_item(name: &str, default: Option<&str>) -> String {
    match default {
        Some(value) => format!("export let {} = {};", name, value),
        None => format!("export let {};", name),
    }
}

fn setter_item<'a>(
    setter: &str,
    ctx: &CompileContext,
    factory: &AstFactory<'a>,
) -> Result<Option<String>, CompileError> {
    let Some(value) = ctx.setters.value_of(setter) else {
        return Ok(None);
    };
    let param = if value == "value" { "nextValue" } else { "value" };
    let func = factory.statement(
        &format!("function {}({}) {{ {} = {}; }}", setter, param, value, param),
        vec![],
    )?;
    Ok(Some(factory.print_statement(&func)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP
// ═══════════════════════════════════════════════════════════════════════════════

/// Replaces `{__RAW_BLOCK_n__}` holes with their block text until none remain.
fn expand_raw_blocks(markup: &str, ctx: &CompileContext) -> String {
    let mut out = markup.to_string();
    // Blocks nest at most as deep as there are blocks.
    for _ in 0..=ctx.raw_blocks.len() {
        if !RAW_BLOCK_HOLE.is_match(&out) {
            break;
        }
        out = RAW_BLOCK_HOLE
            .replace_all(&out, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| ctx.raw_blocks.get(index))
                    .map(|block| block.text.clone())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
    }
    out
}

fn emit_markup<'a>(
    unit: &ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &CompileContext,
) -> Result<String, CompileError> {
    let returned = unit
        .return_argument()
        .filter(|expr| is_jsx(expr))
        .ok_or_else(|| {
            let span = unit
                .return_argument()
                .map(|expr| expr.span())
                .unwrap_or(unit.span);
            ctx.structural(
                ERR_RETURN_SHAPE,
                "The component function must return JSX",
                span,
            )
        })?;
    let printed = factory.print_expression(returned);
    let expanded = expand_raw_blocks(&printed, ctx);
    Ok(FRAGMENT_TAG.replace_all(&expanded, "").into_owned())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSEMBLY
// ═══════════════════════════════════════════════════════════════════════════════

fn indent_item(item: &str, indent: &str) -> String {
    item.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn emit<'a>(
    program: &Program<'a>,
    unit: &ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &CompileContext,
) -> Result<CompileResult, CompileError> {
    let mut script = Vec::new();
    script.extend(lifecycle_import(ctx));
    script.extend(program.body.iter().filter_map(|stmt| module_item(stmt, factory)));
    script.extend(
        ctx.props
            .fields
            .iter()
            .filter(|field| !field.name.starts_with("$$"))
            .map(|field| prop_item(&field.name, field.default.as_deref())),
    );
    let return_index = unit.return_index();
    script.extend(
        unit.statements()
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != return_index)
            .map(|(_, stmt)| factory.print_statement(stmt)),
    );
    for setter in &ctx.synthesized_setters {
        script.extend(setter_item(setter, ctx, factory)?);
    }

    let markup = emit_markup(unit, factory, ctx)?;

    let mut code = String::from("<script>\n");
    for item in &script {
        code.push_str(&indent_item(item, &ctx.options.indent));
        code.push_str("\n\n");
    }
    code.push_str("</script>\n\n");
    code.push_str(&markup);

    debug!(
        script_items = script.len(),
        markup_len = markup.len(),
        "emitted component"
    );

    Ok(CompileResult {
        code,
        script,
        markup,
        props: ctx
            .props
            .names()
            .into_iter()
            .filter(|name| !name.starts_with("$$"))
            .collect(),
        state: ctx.state.iter().map(|cell| cell.value_name.clone()).collect(),
        lifecycle_imports: ctx.lifecycle_imports.iter().map(|s| s.to_string()).collect(),
        synthesized_setters: ctx.synthesized_setters.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RawBlock;
    use crate::parse::CompileOptions;

    #[test]
    fn test_raw_blocks_expand_recursively() {
        let options = CompileOptions::default();
        let mut ctx = CompileContext::new("", &options);
        ctx.raw_blocks.push(RawBlock {
            text: "{#each xs as x}<li>{x}</li>{/each}".to_string(),
            references: Vec::new(),
        });
        ctx.raw_blocks.push(RawBlock {
            text: "{#if show}\n<ul>{__RAW_BLOCK_0__}</ul>\n{/if}".to_string(),
            references: Vec::new(),
        });
        let out = expand_raw_blocks("<div>{__RAW_BLOCK_1__}</div>", &ctx);
        assert_eq!(
            out,
            "<div>{#if show}\n<ul>{#each xs as x}<li>{x}</li>{/each}</ul>\n{/if}</div>"
        );
    }

    #[test]
    fn test_unknown_block_is_left_alone() {
        let options = CompileOptions::default();
        let ctx = CompileContext::new("", &options);
        assert_eq!(expand_raw_blocks("{__RAW_BLOCK_7__}", &ctx), "{__RAW_BLOCK_7__}");
    }

    #[test]
    fn test_fragment_tags_are_stripped() {
        let stripped = FRAGMENT_TAG.replace_all("<><p/></><React.Fragment>a</React.Fragment><Fragment>b</Fragment>", "");
        assert_eq!(stripped, "<p/>ab");
    }

    #[test]
    fn test_prop_items() {
        assert_eq!(prop_item("title", None), "export let title;");
        assert_eq!(prop_item("size", Some("10")), "export let size = 10;");
    }

    #[test]
    fn test_items_are_indented_per_line() {
        assert_eq!(indent_item("a {\n\tb;\n}", "  "), "  a {\n  \tb;\n  }");
    }
}
