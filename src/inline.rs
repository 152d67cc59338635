//! Markup Variable Inliner
//!
//! Variables bound to markup (or to a raw block) at the top level of the
//! module or the component are substituted into expression holes and into the
//! component's return, then their bindings are deleted.

use oxc_allocator::{CloneIn, Vec as OxcVec};
use oxc_ast::ast::*;
use oxc_ast_visit::walk_mut::walk_jsx_expression_container;
use oxc_ast_visit::VisitMut;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::builder::AstFactory;
use crate::context::CompileContext;
use crate::jsx_lowerer::is_placeholder;
use crate::locate::ComponentUnit;
use crate::syntax::{assignment_target_name, binding_identifier_name, is_jsx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Origin {
    Module,
    Component,
}

fn is_markup_value(expr: &Expression<'_>) -> bool {
    is_jsx(expr) || is_placeholder(expr)
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDINGS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MarkupBindings<'a> {
    values: HashMap<String, Expression<'a>>,
    /// (origin, statement index) -> names bound to markup by that statement.
    statements: HashMap<(Origin, usize), Vec<String>>,
}

impl<'a> MarkupBindings<'a> {
    fn record(&mut self, origin: Origin, index: usize, name: &str, value: Expression<'a>) {
        self.values.insert(name.to_string(), value);
        self.statements
            .entry((origin, index))
            .or_default()
            .push(name.to_string());
    }

    fn scan(
        &mut self,
        origin: Origin,
        statements: &OxcVec<'a, Statement<'a>>,
        skip: Option<usize>,
        factory: &AstFactory<'a>,
    ) {
        for (index, stmt) in statements.iter().enumerate() {
            if Some(index) == skip {
                continue;
            }
            let stmt = match stmt {
                Statement::LabeledStatement(label) => &label.body,
                other => other,
            };
            match stmt {
                Statement::VariableDeclaration(decl) => {
                    for declarator in &decl.declarations {
                        if let (Some(name), Some(init)) =
                            (binding_identifier_name(&declarator.id), &declarator.init)
                        {
                            if is_markup_value(init) {
                                self.record(origin, index, name, init.clone_in(factory.allocator));
                            }
                        }
                    }
                }
                Statement::ExpressionStatement(expr_stmt) => {
                    if let Expression::AssignmentExpression(assign) = &expr_stmt.expression {
                        if let Some(name) = assignment_target_name(&assign.left) {
                            if is_markup_value(&assign.right) {
                                self.record(
                                    origin,
                                    index,
                                    name,
                                    assign.right.clone_in(factory.allocator),
                                );
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Drops the bindings recorded for `origin`. Declarations binding several names
/// keep their other declarators.
fn remove_bindings<'a>(
    statements: &mut OxcVec<'a, Statement<'a>>,
    origin: Origin,
    bindings: &HashMap<(Origin, usize), Vec<String>>,
    factory: &AstFactory<'a>,
) -> usize {
    let mut removed = 0;
    let original = std::mem::replace(statements, OxcVec::new_in(factory.allocator));
    for (index, mut stmt) in original.into_iter().enumerate() {
        let Some(names) = bindings.get(&(origin, index)) else {
            statements.push(stmt);
            continue;
        };
        let target = match &mut stmt {
            Statement::LabeledStatement(label) => &mut label.body,
            other => other,
        };
        let keep = match target {
            Statement::VariableDeclaration(decl) => {
                decl.declarations.retain(|declarator| {
                    binding_identifier_name(&declarator.id)
                        .map_or(true, |name| !names.iter().any(|n| n == name))
                });
                !decl.declarations.is_empty()
            }
            _ => false,
        };
        if keep {
            statements.push(stmt);
        } else {
            removed += 1;
        }
    }
    removed
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSTITUTION
// ═══════════════════════════════════════════════════════════════════════════════

struct MarkupInliner<'f, 'a> {
    factory: &'f AstFactory<'a>,
    values: HashMap<String, Expression<'a>>,
    /// Names being expanded, to stop self-referencing markup.
    active: Vec<String>,
    substituted: usize,
}

impl<'f, 'a> MarkupInliner<'f, 'a> {
    /// The fully expanded value of a markup variable.
    fn resolve(&mut self, name: &str) -> Option<Expression<'a>> {
        if self.active.iter().any(|active| active == name) {
            return None;
        }
        let mut value = self.values.get(name)?.clone_in(self.factory.allocator);
        self.active.push(name.to_string());
        self.visit_expression(&mut value);
        self.active.pop();
        self.substituted += 1;
        trace!(name, "inlined markup variable");
        Some(value)
    }

    fn resolve_identifier(&mut self, expr: &Expression<'a>) -> Option<Expression<'a>> {
        match expr {
            Expression::Identifier(ident) => {
                let name = ident.name.to_string();
                self.resolve(&name)
            }
            _ => None,
        }
    }

    fn substitute_children(&mut self, children: &mut OxcVec<'a, JSXChild<'a>>) {
        for child in children.iter_mut() {
            let replacement = match child {
                JSXChild::ExpressionContainer(container) => container
                    .expression
                    .as_expression()
                    .and_then(|expr| self.resolve_identifier(expr))
                    .map(|value| match value {
                        Expression::JSXElement(element) => Ok(JSXChild::Element(element)),
                        Expression::JSXFragment(fragment) => Ok(JSXChild::Fragment(fragment)),
                        other => Err(other),
                    }),
                _ => None,
            };
            match replacement {
                Some(Ok(markup)) => *child = markup,
                Some(Err(placeholder)) => {
                    if let JSXChild::ExpressionContainer(container) = child {
                        if let Some(expr) = container.expression.as_expression_mut() {
                            *expr = placeholder;
                        }
                    }
                }
                None => self.visit_jsx_child(child),
            }
        }
    }

    /// Text a raw block splices in for a markup variable.
    fn markup_text(&mut self, name: &str) -> Option<String> {
        let value = self.resolve(name)?;
        let printed = self.factory.print_expression(&value);
        Some(if is_placeholder(&value) {
            format!("{{{}}}", printed)
        } else {
            printed
        })
    }
}

impl<'f, 'a> VisitMut<'a> for MarkupInliner<'f, 'a> {
    fn visit_jsx_element(&mut self, element: &mut JSXElement<'a>) {
        self.visit_jsx_opening_element(&mut element.opening_element);
        self.substitute_children(&mut element.children);
    }

    fn visit_jsx_fragment(&mut self, fragment: &mut JSXFragment<'a>) {
        self.substitute_children(&mut fragment.children);
    }

    /// Attribute holes.
    fn visit_jsx_expression_container(&mut self, container: &mut JSXExpressionContainer<'a>) {
        let resolved = container
            .expression
            .as_expression()
            .and_then(|expr| self.resolve_identifier(expr));
        if let Some(value) = resolved {
            if let Some(expr) = container.expression.as_expression_mut() {
                *expr = value;
            }
            return;
        }
        walk_jsx_expression_container(self, container);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn inline_markup<'a>(
    program: &mut Program<'a>,
    unit: &mut ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &mut CompileContext,
) {
    let mut bindings = MarkupBindings::default();
    bindings.scan(Origin::Module, &program.body, None, factory);
    bindings.scan(Origin::Component, unit.statements(), Some(unit.return_index()), factory);

    let names: HashSet<String> = bindings.values.keys().cloned().collect();
    let mut inliner = MarkupInliner {
        factory,
        values: std::mem::take(&mut bindings.values),
        active: Vec::new(),
        substituted: 0,
    };

    let returned = unit.return_argument().and_then(|expr| inliner.resolve_identifier(expr));
    if let Some(value) = returned {
        if let Some(expr) = unit.return_argument_mut() {
            *expr = value;
        }
    }
    for stmt in program.body.iter_mut().chain(unit.statements_mut().iter_mut()) {
        inliner.visit_statement(stmt);
    }

    for block in ctx.raw_blocks.iter_mut() {
        for name in block.references.clone() {
            if let Some(text) = inliner.markup_text(&name) {
                block.text = block.text.replace(&format!("{{{}}}", name), &text);
            }
        }
    }

    let removed = remove_bindings(&mut program.body, Origin::Module, &bindings.statements, factory)
        + remove_bindings(unit.statements_mut(), Origin::Component, &bindings.statements, factory);
    ctx.markup_names.extend(names);

    debug!(
        variables = ctx.markup_names.len(),
        substituted = inliner.substituted,
        removed,
        "inlined markup variables"
    );
}
