//! Reactive Binder
//!
//! Finds top-level component statements that read a tracked prop or state
//! name and rewrites each of them, once, into a `$:` reactive statement.
//! Names declared or assigned by a rewritten statement become tracked as
//! well, so dependency chains propagate.

use oxc_allocator::{CloneIn, Vec as OxcVec};
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;
use tracing::trace;

use crate::builder::{hole, AstFactory};
use crate::context::CompileContext;
use crate::diagnostics::CompileError;
use crate::locate::ComponentUnit;
use crate::syntax::{
    assignment_target_name, binding_names, call_hook_name, first_argument, is_effect_hook,
    USE_CALLBACK, USE_MEMO, USE_REDUCER, USE_STATE,
};

// ═══════════════════════════════════════════════════════════════════════════════
// REFERENCE SCAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Looks for reads of tracked names at the top level of one statement.
///
/// Nested functions, existing labels, state-hook arguments and hook dependency
/// arrays are not scanned. `useMemo` callbacks are scanned as if inlined.
struct ReferenceScanner<'n> {
    names: &'n HashSet<String>,
    found: bool,
}

impl<'n> ReferenceScanner<'n> {
    fn visit_inlined_callback<'a>(&mut self, callback: &Expression<'a>) {
        match callback {
            Expression::ArrowFunctionExpression(arrow) => {
                for stmt in &arrow.body.statements {
                    self.visit_statement(stmt);
                }
            }
            Expression::FunctionExpression(func) => {
                if let Some(body) = &func.body {
                    for stmt in &body.statements {
                        self.visit_statement(stmt);
                    }
                }
            }
            other => self.visit_expression(other),
        }
    }
}

impl<'a, 'n> Visit<'a> for ReferenceScanner<'n> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if self.names.contains(ident.name.as_str()) {
            self.found = true;
        }
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        match call_hook_name(call) {
            Some(USE_STATE | USE_REDUCER | USE_CALLBACK) => {}
            Some(name) if is_effect_hook(name) => {}
            Some(USE_MEMO) => {
                if let Some(callback) = first_argument(call) {
                    self.visit_inlined_callback(callback);
                }
            }
            _ => walk::walk_call_expression(self, call),
        }
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _class: &Class<'a>) {}

    fn visit_labeled_statement(&mut self, _stmt: &LabeledStatement<'a>) {}
}

pub fn reads_tracked(stmt: &Statement<'_>, names: &HashSet<String>) -> bool {
    if names.is_empty() {
        return false;
    }
    let mut scanner = ReferenceScanner {
        names,
        found: false,
    };
    scanner.visit_statement(stmt);
    scanner.found
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING
// ═══════════════════════════════════════════════════════════════════════════════

fn wraps_directly(stmt: &Statement<'_>) -> bool {
    matches!(
        stmt,
        Statement::ExpressionStatement(_)
            | Statement::IfStatement(_)
            | Statement::ForStatement(_)
            | Statement::ForInStatement(_)
            | Statement::ForOfStatement(_)
            | Statement::WhileStatement(_)
            | Statement::DoWhileStatement(_)
            | Statement::BlockStatement(_)
            | Statement::SwitchStatement(_)
            | Statement::TryStatement(_)
    )
}

fn assigned_name(stmt: &Statement<'_>) -> Option<String> {
    match stmt {
        Statement::ExpressionStatement(expr_stmt) => match &expr_stmt.expression {
            Expression::AssignmentExpression(assign) => {
                assignment_target_name(&assign.left).map(str::to_string)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Rewrites `statements[index]` into reactive form.
///
/// A single-initializer declaration becomes `$: target = init`; any other
/// wrappable statement becomes `$: stmt`. Statements already compiled or
/// exempt are left alone. Returns whether a rewrite happened.
pub fn bind_statement<'a>(
    statements: &mut OxcVec<'a, Statement<'a>>,
    index: usize,
    ctx: &mut CompileContext,
    factory: &AstFactory<'a>,
) -> Result<bool, CompileError> {
    if ctx.compiled.contains(&index) || ctx.exempt.contains(&index) {
        return Ok(false);
    }
    ctx.compiled.insert(index);

    let Some(stmt) = statements.get(index) else {
        return Ok(false);
    };

    let mut derived = Vec::new();
    let replacement = match stmt {
        Statement::VariableDeclaration(decl) if decl.declarations.len() == 1 => {
            let declarator = &decl.declarations[0];
            let Some(init) = &declarator.init else {
                return Ok(false);
            };
            binding_names(&declarator.id, &mut derived);
            let target = factory.print_binding_pattern(&declarator.id);
            let template = match &declarator.id {
                BindingPattern::ObjectPattern(_) => format!("({} = {});", target, hole(0)),
                _ => format!("{} = {};", target, hole(0)),
            };
            let assignment =
                factory.statement(&template, vec![init.clone_in(factory.allocator)])?;
            factory.reactive_label(assignment)?
        }
        other if wraps_directly(other) => {
            derived.extend(assigned_name(other));
            factory.reactive_label(other.clone_in(factory.allocator))?
        }
        _ => return Ok(false),
    };

    statements[index] = replacement;
    trace!(index, derived = ?derived, "bound reactive statement");
    ctx.tracked.extend(derived);
    Ok(true)
}

/// Binds every top-level statement that transitively reads a tracked name.
pub fn propagate<'a>(
    unit: &mut ComponentUnit<'a>,
    ctx: &mut CompileContext,
    factory: &AstFactory<'a>,
) -> Result<usize, CompileError> {
    let return_index = unit.return_index();
    let mut bound = 0;
    loop {
        let mut changed = false;
        for index in 0..unit.statements().len() {
            if index == return_index
                || ctx.compiled.contains(&index)
                || ctx.exempt.contains(&index)
                || !reads_tracked(&unit.statements()[index], &ctx.tracked)
            {
                continue;
            }
            if bind_statement(unit.statements_mut(), index, ctx, factory)? {
                bound += 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate_component;
    use crate::parse::{parse_module, CompileOptions};
    use oxc_allocator::Allocator;

    fn bind(src: &str, tracked: &[&str]) -> Vec<String> {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let mut program = parse_module(&allocator, src, &options).unwrap();
        let factory = AstFactory::new(&allocator, options.source_type());
        let mut ctx = CompileContext::new(src, &options);
        let mut unit = locate_component(&mut program, &factory, &ctx).unwrap();
        ctx.tracked = tracked.iter().map(|s| s.to_string()).collect();
        propagate(&mut unit, &mut ctx, &factory).unwrap();
        unit.statements()
            .iter()
            .map(|stmt| factory.print_statement(stmt))
            .collect()
    }

    #[test]
    fn test_declaration_becomes_reactive_assignment() {
        let out = bind(
            "export default () => { const title = `Title: ${comment}`; const x = 'a'; return <div/>; };",
            &["comment"],
        );
        assert_eq!(out[0], "$: title = `Title: ${comment}`;");
        assert_eq!(out[1], "const x = 'a';");
    }

    #[test]
    fn test_chains_propagate_through_derived_names() {
        let out = bind(
            "export default () => { const a = p + 1; const b = a * 2; const c = 3; return <div/>; };",
            &["p"],
        );
        assert!(out[0].starts_with("$: a = p + 1"));
        assert!(out[1].starts_with("$: b = a * 2"));
        assert_eq!(out[2], "const c = 3;");
    }

    #[test]
    fn test_nested_functions_and_deps_are_not_reads() {
        let out = bind(
            "export default () => { const cb = () => p; useEffect(() => {}, [p]); const m = useCallback(() => 1, [p]); return <div>{p}</div>; };",
            &["p"],
        );
        assert_eq!(out[0], "const cb = () => p;");
        assert!(out[1].starts_with("useEffect("));
        assert!(out[2].starts_with("const m = useCallback("));
        assert!(!out[3].starts_with("$:"));
    }

    #[test]
    fn test_memo_callback_is_scanned_inline() {
        let out = bind(
            "export default () => { const d = useMemo(() => p * 2, [p]); return <div/>; };",
            &["p"],
        );
        assert!(out[0].starts_with("$: d = useMemo("));
    }

    #[test]
    fn test_other_statements_are_wrapped_once() {
        let out = bind(
            "export default () => { console.log(p); if (p) { go(); } return <div/>; };",
            &["p"],
        );
        assert_eq!(out[0], "$: console.log(p);");
        assert!(out[1].starts_with("$: if (p)"));
    }

    #[test]
    fn test_object_destructuring_is_parenthesized() {
        let out = bind(
            "export default () => { const { a, b } = $$props; return <div/>; };",
            &["$$props"],
        );
        assert!(out[0].starts_with("$: ({"));
        assert!(out[0].contains("} = $$props);"));
    }
}
