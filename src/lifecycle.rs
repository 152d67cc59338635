//! Lifecycle and memo hook lowering.
//!
//! Effect hooks become `onMount` / `afterUpdate` calls with an optional
//! `onDestroy` for the returned cleanup. Memo-style hooks are replaced by the
//! value they compute, and reducer state is rejected.

use oxc_allocator::{CloneIn, Vec as OxcVec};
use oxc_ast::ast::*;
use oxc_ast_visit::walk_mut::walk_expression;
use oxc_ast_visit::VisitMut;
use oxc_span::GetSpan;
use tracing::{debug, trace};

use crate::builder::{hole, AstFactory};
use crate::context::{CompileContext, EffectClass, DESTROY_LIFECYCLE};
use crate::diagnostics::{
    CompileError, ERR_EFFECT_CALLBACK, ERR_EFFECT_CLEANUP, ERR_EFFECT_PLACEMENT, ERR_MEMO_ARGUMENT,
    ERR_REDUCER,
};
use crate::locate::ComponentUnit;
use crate::syntax::{
    call_hook_name, concise_body, first_argument, is_effect_hook, is_function_like, HookFinder,
    MEMO, USE_CALLBACK, USE_MEMO, USE_REDUCER,
};

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECTS
// ═══════════════════════════════════════════════════════════════════════════════

fn classify(call: &CallExpression<'_>) -> EffectClass {
    match call.arguments.get(1).and_then(Argument::as_expression) {
        Some(Expression::ArrayExpression(deps)) if deps.elements.is_empty() => {
            EffectClass::MountOnly
        }
        Some(Expression::ArrayExpression(_)) => EffectClass::UpdateOnDeps,
        _ => EffectClass::UpdateAlways,
    }
}

fn is_cleanup_value(expr: &Expression<'_>) -> bool {
    is_function_like(expr) || matches!(expr, Expression::Identifier(_))
}

/// A lowered effect: the callback left after cleanup extraction, if anything
/// remains of it, and the cleanup function.
struct LoweredEffect<'a> {
    class: EffectClass,
    callback: Option<Expression<'a>>,
    cleanup: Option<Expression<'a>>,
}

fn lower_effect<'a>(
    hook: &str,
    call: &CallExpression<'a>,
    factory: &AstFactory<'a>,
    ctx: &CompileContext,
) -> Result<LoweredEffect<'a>, CompileError> {
    let callback = first_argument(call)
        .filter(|arg| is_function_like(arg))
        .ok_or_else(|| {
            ctx.structural(
                ERR_EFFECT_CALLBACK,
                format!("The first argument passed to {} must be a function expression.", hook),
                call.span,
            )
        })?;
    let class = classify(call);
    let mut callback = callback.clone_in(factory.allocator);

    let cleanup = match &mut callback {
        Expression::ArrowFunctionExpression(arrow) if arrow.expression => {
            match concise_body(arrow) {
                Some(body) if is_cleanup_value(body) => {
                    let cleanup = body.clone_in(factory.allocator);
                    arrow.body.statements.clear();
                    arrow.expression = false;
                    Some(cleanup)
                }
                _ => None,
            }
        }
        Expression::ArrowFunctionExpression(arrow) => {
            extract_cleanup(&mut arrow.body.statements, factory, ctx)?
        }
        Expression::FunctionExpression(func) => match func.body.as_mut() {
            Some(body) => extract_cleanup(&mut body.statements, factory, ctx)?,
            None => None,
        },
        _ => None,
    };

    let emptied = match &callback {
        Expression::ArrowFunctionExpression(arrow) => arrow.body.statements.is_empty(),
        Expression::FunctionExpression(func) => {
            func.body.as_ref().map_or(true, |body| body.statements.is_empty())
        }
        _ => false,
    };

    Ok(LoweredEffect {
        class,
        callback: if emptied && cleanup.is_some() {
            None
        } else {
            Some(callback)
        },
        cleanup,
    })
}

/// Removes the top-level `return <cleanup>` from an effect body.
fn extract_cleanup<'a>(
    statements: &mut OxcVec<'a, Statement<'a>>,
    factory: &AstFactory<'a>,
    ctx: &CompileContext,
) -> Result<Option<Expression<'a>>, CompileError> {
    let Some(index) = statements
        .iter()
        .rposition(|stmt| matches!(stmt, Statement::ReturnStatement(_)))
    else {
        return Ok(None);
    };
    let cleanup = match &statements[index] {
        Statement::ReturnStatement(ret) => match &ret.argument {
            None => None,
            Some(value) if is_cleanup_value(value) => Some(value.clone_in(factory.allocator)),
            Some(value) => {
                return Err(ctx.structural(
                    ERR_EFFECT_CLEANUP,
                    "Cleanup function must be returned as a function expression.",
                    value.span(),
                ))
            }
        },
        _ => None,
    };
    statements.remove(index);
    Ok(cleanup)
}

fn effect_call<'b, 'a>(stmt: &'b Statement<'a>) -> Option<(&'b str, &'b CallExpression<'a>)> {
    let Statement::ExpressionStatement(expr_stmt) = stmt else {
        return None;
    };
    let Expression::CallExpression(call) = &expr_stmt.expression else {
        return None;
    };
    let hook = call_hook_name(call)?;
    is_effect_hook(hook).then_some((hook, &**call))
}

fn lower_effects<'a>(
    unit: &mut ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &mut CompileContext,
) -> Result<usize, CompileError> {
    let mut lowered = 0;
    let original = std::mem::replace(unit.statements_mut(), OxcVec::new_in(factory.allocator));
    for stmt in original {
        let Some((hook, call)) = effect_call(&stmt) else {
            unit.statements_mut().push(stmt);
            continue;
        };
        let effect = lower_effect(hook, call, factory, ctx)?;
        trace!(hook, class = ?effect.class, cleanup = effect.cleanup.is_some(), "lowered effect");
        if let Some(callback) = effect.callback {
            let name = effect.class.lifecycle_name();
            let call = factory.statement(&format!("{}({});", name, hole(0)), vec![callback])?;
            unit.statements_mut().push(call);
            ctx.use_lifecycle(name);
        }
        if let Some(cleanup) = effect.cleanup {
            let destroy =
                factory.statement(&format!("{}({});", DESTROY_LIFECYCLE, hole(0)), vec![cleanup])?;
            unit.statements_mut().push(destroy);
            ctx.use_lifecycle(DESTROY_LIFECYCLE);
        }
        lowered += 1;
    }

    if let Some(span) = HookFinder::new(is_effect_hook).find_in(unit.statements()) {
        return Err(ctx.structural(
            ERR_EFFECT_PLACEMENT,
            "Effect hooks must be called at the top level of the component body",
            span,
        ));
    }
    Ok(lowered)
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMO HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

struct MemoHookRewriter<'f, 'c, 's, 'a> {
    factory: &'f AstFactory<'a>,
    ctx: &'c CompileContext<'s>,
    replaced: usize,
    error: Option<CompileError>,
}

impl<'f, 'c, 's, 'a> MemoHookRewriter<'f, 'c, 's, 'a> {
    /// The value a memo callback computes: its concise body or first top-level return.
    /// Statements ahead of that return are dropped, so locals they declare are lost.
    fn memo_value(&self, callback: &Expression<'a>) -> Result<Expression<'a>, CompileError> {
        let statements = match callback {
            Expression::ArrowFunctionExpression(arrow) => {
                if let Some(body) = concise_body(arrow) {
                    return Ok(body.clone_in(self.factory.allocator));
                }
                &arrow.body.statements
            }
            Expression::FunctionExpression(func) => match &func.body {
                Some(body) => &body.statements,
                None => return self.factory.identifier("undefined"),
            },
            _ => return self.factory.identifier("undefined"),
        };
        let value = statements.iter().find_map(|stmt| match stmt {
            Statement::ReturnStatement(ret) => Some(ret.argument.as_ref()),
            _ => None,
        });
        match value.flatten() {
            Some(value) => Ok(value.clone_in(self.factory.allocator)),
            None => self.factory.identifier("undefined"),
        }
    }

    fn replacement(&self, call: &CallExpression<'a>) -> Result<Option<Expression<'a>>, CompileError> {
        let first = || match first_argument(call) {
            Some(arg) => Ok(arg.clone_in(self.factory.allocator)),
            None => self.factory.identifier("undefined"),
        };
        match call_hook_name(call) {
            Some(USE_MEMO) => match first_argument(call) {
                Some(callback) if is_function_like(callback) => self.memo_value(callback).map(Some),
                _ => Err(self.ctx.unsupported(
                    ERR_MEMO_ARGUMENT,
                    "The first argument passed to useMemo must be a function expression, not a reference to a function.",
                    call.span,
                )),
            },
            Some(USE_CALLBACK | MEMO) => first().map(Some),
            Some(USE_REDUCER) => Err(self.ctx.unsupported(
                ERR_REDUCER,
                "useReducer is not supported yet",
                call.span,
            )),
            _ => Ok(None),
        }
    }
}

impl<'f, 'c, 's, 'a> VisitMut<'a> for MemoHookRewriter<'f, 'c, 's, 'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if self.error.is_some() {
            return;
        }
        let replacement = match expr {
            Expression::CallExpression(call) => self.replacement(call),
            _ => Ok(None),
        };
        match replacement {
            Ok(Some(value)) => {
                *expr = value;
                self.replaced += 1;
                // The computed value may itself hold hooks.
                self.visit_expression(expr);
            }
            Ok(None) => walk_expression(self, expr),
            Err(error) => self.error = Some(error),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn lower_hooks<'a>(
    program: &mut Program<'a>,
    unit: &mut ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &mut CompileContext,
) -> Result<(), CompileError> {
    let effects = lower_effects(unit, factory, ctx)?;

    let mut rewriter = MemoHookRewriter {
        factory,
        ctx: &*ctx,
        replaced: 0,
        error: None,
    };
    for stmt in program.body.iter_mut().chain(unit.statements_mut().iter_mut()) {
        rewriter.visit_statement(stmt);
    }
    if let Some(error) = rewriter.error {
        return Err(error);
    }

    debug!(
        effects,
        memo_hooks = rewriter.replaced,
        lifecycle = ?ctx.lifecycle_imports,
        "lowered hooks"
    );
    Ok(())
}
