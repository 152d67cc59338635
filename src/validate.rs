//! Structural Validator
//!
//! Checks where markup appears before any lowering runs. Markup may not sit in
//! a loop, in an `if` body or a conditional that is not placed directly in an
//! expression hole, or in a function other than the component itself or a
//! `.map` callback.

use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;
use tracing::debug;

use crate::context::CompileContext;
use crate::diagnostics::{
    CompileError, ERR_MARKUP_IN_BRANCH, ERR_MARKUP_IN_FOREIGN_FUNCTION, ERR_MARKUP_IN_LOOP,
};
use crate::locate::ComponentUnit;
use crate::syntax::map_call_parts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    If,
    /// A ternary; `in_hole` when it is the whole content of an expression hole,
    /// or a branch of one that is.
    Conditional { in_hole: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Enclosing {
    Component,
    MapCallback,
    Other,
}

struct PlacementValidator<'c, 's> {
    ctx: &'c CompileContext<'s>,
    loop_depth: usize,
    branches: Vec<Branch>,
    functions: Vec<Enclosing>,
    map_callbacks: HashSet<Span>,
    hole_conditionals: HashSet<Span>,
    markup_seen: usize,
    error: Option<CompileError>,
}

impl<'c, 's> PlacementValidator<'c, 's> {
    fn new(ctx: &'c CompileContext<'s>) -> Self {
        Self {
            ctx,
            loop_depth: 0,
            branches: Vec::new(),
            functions: Vec::new(),
            map_callbacks: HashSet::new(),
            hole_conditionals: HashSet::new(),
            markup_seen: 0,
            error: None,
        }
    }

    /// Returns false once an error has been recorded so the walk stops descending.
    fn check_markup(&mut self, span: Span) -> bool {
        if self.error.is_some() {
            return false;
        }
        self.markup_seen += 1;
        let error = if self.loop_depth > 0 {
            Some(self.ctx.structural(
                ERR_MARKUP_IN_LOOP,
                "JSX inside loops cannot be compiled",
                span,
            ))
        } else if matches!(
            self.branches.last(),
            Some(Branch::If | Branch::Conditional { in_hole: false })
        ) {
            Some(self.ctx.structural(
                ERR_MARKUP_IN_BRANCH,
                "JSX inside conditionals cannot be compiled",
                span,
            ))
        } else if self.functions.last() == Some(&Enclosing::Other) {
            Some(self.ctx.structural(
                ERR_MARKUP_IN_FOREIGN_FUNCTION,
                "It seems like you have a JSX element inside a function that is not the exported function. This cannot be compiled.",
                span,
            ))
        } else {
            None
        };
        self.error = error;
        self.error.is_none()
    }

    fn enter_function(&mut self, span: Span) {
        let kind = if self.map_callbacks.contains(&span) {
            Enclosing::MapCallback
        } else {
            Enclosing::Other
        };
        self.functions.push(kind);
    }

    fn in_loop<F: FnOnce(&mut Self)>(&mut self, visit: F) {
        self.loop_depth += 1;
        visit(self);
        self.loop_depth -= 1;
    }
}

impl<'a, 'c, 's> Visit<'a> for PlacementValidator<'c, 's> {
    fn visit_jsx_element(&mut self, element: &JSXElement<'a>) {
        if self.check_markup(element.span) {
            walk::walk_jsx_element(self, element);
        }
    }

    fn visit_jsx_fragment(&mut self, fragment: &JSXFragment<'a>) {
        if self.check_markup(fragment.span) {
            walk::walk_jsx_fragment(self, fragment);
        }
    }

    fn visit_jsx_expression_container(&mut self, container: &JSXExpressionContainer<'a>) {
        if let Some(Expression::ConditionalExpression(cond)) = container.expression.as_expression()
        {
            self.hole_conditionals.insert(cond.span);
        }
        walk::walk_jsx_expression_container(self, container);
    }

    fn visit_conditional_expression(&mut self, cond: &ConditionalExpression<'a>) {
        let inherited = self.branches.last() == Some(&Branch::Conditional { in_hole: true });
        let in_hole = self.hole_conditionals.contains(&cond.span) || inherited;
        self.visit_expression(&cond.test);
        self.branches.push(Branch::Conditional { in_hole });
        self.visit_expression(&cond.consequent);
        self.visit_expression(&cond.alternate);
        self.branches.pop();
    }

    fn visit_if_statement(&mut self, stmt: &IfStatement<'a>) {
        self.visit_expression(&stmt.test);
        self.branches.push(Branch::If);
        self.visit_statement(&stmt.consequent);
        if let Some(alternate) = &stmt.alternate {
            self.visit_statement(alternate);
        }
        self.branches.pop();
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Some((_, callback)) = map_call_parts(call) {
            self.map_callbacks.insert(callback.span());
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        self.enter_function(func.span);
        // A function body starts a fresh branch context.
        let branches = std::mem::take(&mut self.branches);
        walk::walk_function(self, func, flags);
        self.branches = branches;
        self.functions.pop();
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        self.enter_function(arrow.span);
        let branches = std::mem::take(&mut self.branches);
        walk::walk_arrow_function_expression(self, arrow);
        self.branches = branches;
        self.functions.pop();
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        self.in_loop(|v| walk::walk_for_statement(v, stmt));
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        self.in_loop(|v| walk::walk_for_in_statement(v, stmt));
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        self.in_loop(|v| walk::walk_for_of_statement(v, stmt));
    }

    fn visit_while_statement(&mut self, stmt: &WhileStatement<'a>) {
        self.in_loop(|v| walk::walk_while_statement(v, stmt));
    }

    fn visit_do_while_statement(&mut self, stmt: &DoWhileStatement<'a>) {
        self.in_loop(|v| walk::walk_do_while_statement(v, stmt));
    }
}

/// Validates markup placement across the remaining module statements and the
/// component body.
pub fn validate_placement(
    program: &Program<'_>,
    unit: &ComponentUnit<'_>,
    ctx: &CompileContext,
) -> Result<(), CompileError> {
    let mut validator = PlacementValidator::new(ctx);
    for stmt in &program.body {
        validator.visit_statement(stmt);
    }
    validator.functions.push(Enclosing::Component);
    for stmt in unit.statements() {
        validator.visit_statement(stmt);
    }
    if let Some(error) = validator.error {
        return Err(error);
    }
    debug!(markup = validator.markup_seen, "validated markup placement");
    Ok(())
}
