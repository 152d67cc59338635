//! JSX lowering for the Svelte target.
//!
//! Runs after placement validation. Attribute names are translated first, then
//! `.map` calls and markup conditionals in expression holes are replaced by
//! raw blocks holding pre-rendered `{#each}` / `{#if}` text. The tree keeps a
//! placeholder identifier where each raw block belongs.

use lazy_static::lazy_static;
use oxc_allocator::Vec as OxcVec;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::{walk_expression, walk_jsx_attribute, walk_jsx_expression_container};
use oxc_ast_visit::{walk, Visit, VisitMut};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::builder::AstFactory;
use crate::context::{CompileContext, RawBlock};
use crate::diagnostics::CompileError;
use crate::locate::ComponentUnit;
use crate::syntax::{assignment_target_name, binding_identifier_name, is_jsx, map_call_parts};

lazy_static! {
    static ref EVENT_ATTRIBUTE: Regex = Regex::new(r"(?i)^on([a-z]+)$").unwrap();
}

pub fn is_placeholder(expr: &Expression<'_>) -> bool {
    matches!(expr, Expression::Identifier(ident) if RawBlock::index_of(ident.name.as_str()).is_some())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// className -> class, onClick -> on:click
// ═══════════════════════════════════════════════════════════════════════════════

struct AttributeTranslator<'a> {
    ast: AstBuilder<'a>,
    translated: usize,
}

impl<'a> VisitMut<'a> for AttributeTranslator<'a> {
    fn visit_jsx_attribute(&mut self, attr: &mut JSXAttribute<'a>) {
        let renamed = match &attr.name {
            JSXAttributeName::Identifier(id) if id.name.as_str() == "className" => {
                Some(self.ast.jsx_attribute_name_identifier(id.span, "class"))
            }
            JSXAttributeName::Identifier(id) => EVENT_ATTRIBUTE
                .captures(id.name.as_str())
                .and_then(|caps| caps.get(1))
                .map(|event| {
                    let event = self.ast.allocator.alloc_str(&event.as_str().to_lowercase());
                    self.ast.jsx_attribute_name_namespaced_name(
                        id.span,
                        self.ast.jsx_identifier(id.span, "on"),
                        self.ast.jsx_identifier(id.span, event),
                    )
                }),
            JSXAttributeName::NamespacedName(_) => None,
        };
        if let Some(name) = renamed {
            attr.name = name;
            self.translated += 1;
        }
        walk_jsx_attribute(self, attr);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LISTS
// items.map(item => <li key={item.id}>...</li>) -> {#each items as item (item.id)}...{/each}
// ═══════════════════════════════════════════════════════════════════════════════

/// The markup a `.map` callback renders, when its body is that markup or a
/// single return of it.
fn callback_markup_mut<'b, 'a>(callback: &'b mut Expression<'a>) -> Option<&'b mut Expression<'a>> {
    let (statements, concise) = match callback {
        Expression::ArrowFunctionExpression(arrow) => {
            let concise = arrow.expression;
            (&mut arrow.body.statements, concise)
        }
        Expression::FunctionExpression(func) => (&mut func.body.as_mut()?.statements, false),
        _ => return None,
    };
    single_markup_mut(statements, concise)
}

fn single_markup_mut<'b, 'a>(
    statements: &'b mut OxcVec<'a, Statement<'a>>,
    concise: bool,
) -> Option<&'b mut Expression<'a>> {
    if statements.len() != 1 {
        return None;
    }
    let expr = match statements.first_mut()? {
        Statement::ExpressionStatement(stmt) if concise => &mut stmt.expression,
        Statement::ReturnStatement(ret) => ret.argument.as_mut()?,
        _ => return None,
    };
    if is_jsx(expr) {
        Some(expr)
    } else {
        None
    }
}

/// Removes the `key` attribute from the root element and returns its printed value.
fn take_key<'a>(root: &mut Expression<'a>, factory: &AstFactory<'a>) -> Option<String> {
    let Expression::JSXElement(element) = root else {
        return None;
    };
    let attributes = &mut element.opening_element.attributes;
    let index = attributes.iter().position(|item| {
        matches!(item, JSXAttributeItem::Attribute(attr)
            if matches!(&attr.name, JSXAttributeName::Identifier(id) if id.name.as_str() == "key"))
    })?;
    let printed = match &attributes[index] {
        JSXAttributeItem::Attribute(attr) => match &attr.value {
            Some(JSXAttributeValue::ExpressionContainer(container)) => container
                .expression
                .as_expression()
                .map(|expr| factory.print_expression(expr)),
            Some(JSXAttributeValue::StringLiteral(lit)) => Some(format!("\"{}\"", lit.value)),
            _ => None,
        },
        JSXAttributeItem::SpreadAttribute(_) => None,
    };
    attributes.remove(index);
    printed
}

struct ListLowerer<'f, 'c, 's, 'a> {
    factory: &'f AstFactory<'a>,
    ctx: &'c mut CompileContext<'s>,
    lowered: usize,
    error: Option<CompileError>,
}

impl<'f, 'c, 's, 'a> ListLowerer<'f, 'c, 's, 'a> {
    fn lower(&mut self, expr: &mut Expression<'a>) -> Result<Option<String>, CompileError> {
        let Expression::CallExpression(call) = expr else {
            return Ok(None);
        };
        let Some((object, callback)) = map_call_parts(call) else {
            return Ok(None);
        };
        let params = match callback {
            Expression::ArrowFunctionExpression(arrow) => &arrow.params,
            Expression::FunctionExpression(func) => &func.params,
            _ => return Ok(None),
        };
        let Some(item) = params
            .items
            .first()
            .map(|param| self.factory.print_binding_pattern(&param.pattern))
        else {
            return Ok(None);
        };
        let collection = self.factory.print_expression(object);

        let Some(root) = call
            .arguments
            .first_mut()
            .and_then(Argument::as_expression_mut)
            .and_then(callback_markup_mut)
        else {
            return Ok(None);
        };
        let key = take_key(root, self.factory);

        // The body is frozen to text here, so its conditionals are lowered first.
        let mut conditionals = ConditionalLowerer {
            factory: self.factory,
            ctx: &mut *self.ctx,
            attribute_depth: 0,
            lowered: 0,
            error: None,
        };
        conditionals.visit_expression(root);
        if let Some(error) = conditionals.error {
            return Err(error);
        }
        let mut holes = HoleReferences {
            markup_names: &self.ctx.markup_names,
            references: Vec::new(),
        };
        holes.visit_expression(root);
        let references = holes.references;
        let body = self.factory.print_expression(root);

        let text = match key {
            Some(key) => format!(
                "{{#each {} as {} ({})}}{}{{/each}}",
                collection, item, key, body
            ),
            None => format!("{{#each {} as {}}}{}{{/each}}", collection, item, body),
        };
        trace!(collection = %collection, item = %item, "lowered list");
        Ok(Some(self.ctx.push_raw_block(text, references)))
    }
}

/// Markup variables used as child holes of a list body, spliced in by the inliner.
struct HoleReferences<'n> {
    markup_names: &'n HashSet<String>,
    references: Vec<String>,
}

impl<'a, 'n> Visit<'a> for HoleReferences<'n> {
    fn visit_jsx_attribute(&mut self, _attr: &JSXAttribute<'a>) {}

    fn visit_jsx_expression_container(&mut self, container: &JSXExpressionContainer<'a>) {
        if let Some(Expression::Identifier(ident)) = container.expression.as_expression() {
            let name = ident.name.as_str();
            if self.markup_names.contains(name) && !self.references.iter().any(|r| r == name) {
                self.references.push(name.to_string());
            }
            return;
        }
        walk::walk_jsx_expression_container(self, container);
    }
}

impl<'f, 'c, 's, 'a> VisitMut<'a> for ListLowerer<'f, 'c, 's, 'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if self.error.is_some() {
            return;
        }
        // Inner lists first so an outer body prints their placeholders.
        walk_expression(self, expr);
        match self.lower(expr) {
            Ok(Some(placeholder)) => match self.factory.identifier(&placeholder) {
                Ok(replacement) => {
                    *expr = replacement;
                    self.lowered += 1;
                }
                Err(error) => self.error = Some(error),
            },
            Ok(None) => {}
            Err(error) => self.error = Some(error),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MARKUP NAMES
// ═══════════════════════════════════════════════════════════════════════════════

fn is_markup_value(expr: &Expression<'_>) -> bool {
    is_jsx(expr) || is_placeholder(expr)
}

/// Collects names bound to markup or a raw block by declaration or assignment.
#[derive(Default)]
struct MarkupNameCollector {
    names: Vec<String>,
}

impl<'a> Visit<'a> for MarkupNameCollector {
    fn visit_variable_declarator(&mut self, declarator: &VariableDeclarator<'a>) {
        if let (Some(name), Some(init)) = (binding_identifier_name(&declarator.id), &declarator.init) {
            if is_markup_value(init) {
                self.names.push(name.to_string());
            }
        }
        walk::walk_variable_declarator(self, declarator);
    }

    fn visit_assignment_expression(&mut self, assign: &AssignmentExpression<'a>) {
        if let Some(name) = assignment_target_name(&assign.left) {
            if is_markup_value(&assign.right) {
                self.names.push(name.to_string());
            }
        }
        walk::walk_assignment_expression(self, assign);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONDITIONALS
// {a ? <x/> : <y/>} -> {#if a}...{:else}...{/if}, {a && <x/>} -> {#if a}...{/if}
// ═══════════════════════════════════════════════════════════════════════════════

struct ConditionalLowerer<'f, 'c, 's, 'a> {
    factory: &'f AstFactory<'a>,
    ctx: &'c mut CompileContext<'s>,
    attribute_depth: usize,
    lowered: usize,
    error: Option<CompileError>,
}

impl<'f, 'c, 's, 'a> ConditionalLowerer<'f, 'c, 's, 'a> {
    fn is_markup(&self, expr: &Expression<'_>) -> bool {
        match expr {
            Expression::Identifier(ident) => {
                is_placeholder(expr) || self.ctx.markup_names.contains(ident.name.as_str())
            }
            other => is_jsx(other),
        }
    }

    fn is_lowerable(&self, expr: &Expression<'_>) -> bool {
        match expr {
            Expression::ConditionalExpression(cond) => {
                self.is_markup(&cond.consequent)
                    || self.is_markup(&cond.alternate)
                    || self.is_lowerable(&cond.consequent)
                    || self.is_lowerable(&cond.alternate)
            }
            Expression::LogicalExpression(logical) => {
                logical.operator == LogicalOperator::And
                    && (self.is_markup(&logical.right) || self.is_lowerable(&logical.right))
            }
            _ => false,
        }
    }

    fn render_branch(&self, expr: &Expression<'a>, references: &mut Vec<String>) -> String {
        match expr {
            Expression::NullLiteral(_) => String::new(),
            Expression::Identifier(ident) if ident.name.as_str() == "undefined" => String::new(),
            Expression::Identifier(ident) => {
                let name = ident.name.as_str();
                if self.ctx.markup_names.contains(name) && !references.iter().any(|r| r == name) {
                    references.push(name.to_string());
                }
                format!("{{{}}}", name)
            }
            other if is_jsx(other) => self.factory.print_expression(other),
            other if self.is_lowerable(other) => self.render_block(other, references),
            other => format!("{{{}}}", self.factory.print_expression(other)),
        }
    }

    fn render_block(&self, expr: &Expression<'a>, references: &mut Vec<String>) -> String {
        match expr {
            Expression::ConditionalExpression(cond) => format!(
                "{{#if {}}}\n{}\n{{:else}}\n{}\n{{/if}}\n",
                self.factory.print_expression(&cond.test),
                self.render_branch(&cond.consequent, references),
                self.render_branch(&cond.alternate, references),
            ),
            Expression::LogicalExpression(logical) => format!(
                "{{#if {}}}\n{}\n{{/if}}",
                self.factory.print_expression(&logical.left),
                self.render_branch(&logical.right, references),
            ),
            other => self.render_branch(other, references),
        }
    }
}

impl<'f, 'c, 's, 'a> VisitMut<'a> for ConditionalLowerer<'f, 'c, 's, 'a> {
    fn visit_jsx_attribute(&mut self, attr: &mut JSXAttribute<'a>) {
        self.attribute_depth += 1;
        walk_jsx_attribute(self, attr);
        self.attribute_depth -= 1;
    }

    fn visit_jsx_expression_container(&mut self, container: &mut JSXExpressionContainer<'a>) {
        if self.error.is_some() {
            return;
        }
        walk_jsx_expression_container(self, container);
        if self.attribute_depth > 0 {
            return;
        }
        let Some(expr) = container.expression.as_expression_mut() else {
            return;
        };
        if !self.is_lowerable(expr) {
            return;
        }
        let mut references = Vec::new();
        let text = self.render_block(expr, &mut references);
        let placeholder = self.ctx.push_raw_block(text, references);
        match self.factory.identifier(&placeholder) {
            Ok(replacement) => {
                trace!(placeholder = %placeholder, "lowered conditional");
                *expr = replacement;
                self.lowered += 1;
            }
            Err(error) => self.error = Some(error),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

fn collect_markup_names<'a>(program: &Program<'a>, unit: &ComponentUnit<'a>, ctx: &mut CompileContext) {
    let mut collector = MarkupNameCollector::default();
    for stmt in program.body.iter().chain(unit.statements().iter()) {
        collector.visit_statement(stmt);
    }
    ctx.markup_names.extend(collector.names);
}

pub fn lower_markup<'a>(
    program: &mut Program<'a>,
    unit: &mut ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &mut CompileContext,
) -> Result<(), CompileError> {
    let mut attributes = AttributeTranslator {
        ast: AstBuilder::new(factory.allocator),
        translated: 0,
    };
    for stmt in program.body.iter_mut().chain(unit.statements_mut().iter_mut()) {
        attributes.visit_statement(stmt);
    }

    // List bodies need the names bound to markup before they are printed.
    collect_markup_names(program, unit, ctx);

    let mut lists = ListLowerer {
        factory,
        ctx: &mut *ctx,
        lowered: 0,
        error: None,
    };
    for stmt in program.body.iter_mut().chain(unit.statements_mut().iter_mut()) {
        lists.visit_statement(stmt);
    }
    let lists_lowered = lists.lowered;
    if let Some(error) = lists.error {
        return Err(error);
    }

    // Again, now that lists bound to names are placeholders.
    collect_markup_names(program, unit, ctx);

    let mut conditionals = ConditionalLowerer {
        factory,
        ctx: &mut *ctx,
        attribute_depth: 0,
        lowered: 0,
        error: None,
    };
    for stmt in program.body.iter_mut().chain(unit.statements_mut().iter_mut()) {
        conditionals.visit_statement(stmt);
    }
    let conditionals_lowered = conditionals.lowered;
    if let Some(error) = conditionals.error {
        return Err(error);
    }

    debug!(
        attributes = attributes.translated,
        lists = lists_lowered,
        conditionals = conditionals_lowered,
        markup_names = ctx.markup_names.len(),
        "lowered markup"
    );
    Ok(())
}
