//! Component Locator
//!
//! Resolves the default-exported component, lifts its parameters and body out
//! of the program, and removes the statements that made up the export so the
//! emitter never prints them.

use oxc_allocator::{Box as OxcBox, CloneIn};
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};
use oxc_syntax::scope::ScopeFlags;
use tracing::debug;

use crate::builder::AstFactory;
use crate::context::CompileContext;
use crate::diagnostics::{CompileError, ERR_NO_EXPORT, ERR_RETURN_SHAPE};
use crate::syntax::{
    assignment_target_name, binding_identifier_name, callee_name, concise_body, first_argument, MEMO,
};

/// The resolved exported component, owned by the compile run.
pub struct ComponentUnit<'a> {
    pub name: Option<String>,
    pub span: Span,
    pub params: OxcBox<'a, FormalParameters<'a>>,
    pub body: OxcBox<'a, FunctionBody<'a>>,
    /// Spans of the top-level statements that resolved the export.
    pub export_statements: Vec<Span>,
}

impl<'a> ComponentUnit<'a> {
    pub fn statements(&self) -> &oxc_allocator::Vec<'a, Statement<'a>> {
        &self.body.statements
    }

    pub fn statements_mut(&mut self) -> &mut oxc_allocator::Vec<'a, Statement<'a>> {
        &mut self.body.statements
    }

    /// Index of the terminal return statement.
    pub fn return_index(&self) -> usize {
        self.body.statements.len().saturating_sub(1)
    }

    pub fn return_argument(&self) -> Option<&Expression<'a>> {
        match self.body.statements.last() {
            Some(Statement::ReturnStatement(ret)) => ret.argument.as_ref(),
            _ => None,
        }
    }

    pub fn return_argument_mut(&mut self) -> Option<&mut Expression<'a>> {
        match self.body.statements.last_mut() {
            Some(Statement::ReturnStatement(ret)) => ret.argument.as_mut(),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORT RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

enum Resolved<'r, 'a> {
    Function(&'r Function<'a>),
    Arrow(&'r ArrowFunctionExpression<'a>),
}

fn unwrap_memo<'r, 'a>(expr: &'r Expression<'a>) -> &'r Expression<'a> {
    match expr {
        Expression::CallExpression(call) if callee_name(&call.callee) == Some(MEMO) => {
            first_argument(call).map(unwrap_memo).unwrap_or(expr)
        }
        _ => expr,
    }
}

fn resolve_expression<'r, 'a>(
    expr: &'r Expression<'a>,
    program: &'r Program<'a>,
    used: &mut Vec<Span>,
) -> Option<(Resolved<'r, 'a>, Option<String>)> {
    match unwrap_memo(expr) {
        Expression::FunctionExpression(func) => Some((
            Resolved::Function(func),
            func.id.as_ref().map(|id| id.name.to_string()),
        )),
        Expression::ArrowFunctionExpression(arrow) => Some((Resolved::Arrow(arrow), None)),
        Expression::Identifier(ident) => resolve_identifier(ident.name.as_str(), program, used),
        Expression::AssignmentExpression(assign) => {
            let (resolved, name) = resolve_expression(&assign.right, program, used)?;
            let target = assignment_target_name(&assign.left).map(str::to_string);
            Some((resolved, name.or(target)))
        }
        _ => None,
    }
}

/// Finds the top-level declaration, assignment or function declaration that gives
/// `name` a function value.
fn resolve_identifier<'r, 'a>(
    name: &str,
    program: &'r Program<'a>,
    used: &mut Vec<Span>,
) -> Option<(Resolved<'r, 'a>, Option<String>)> {
    for stmt in &program.body {
        match stmt {
            Statement::FunctionDeclaration(func)
                if func.id.as_ref().is_some_and(|id| id.name.as_str() == name) =>
            {
                used.push(stmt.span());
                return Some((Resolved::Function(func), Some(name.to_string())));
            }
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    if binding_identifier_name(&declarator.id) != Some(name) {
                        continue;
                    }
                    if let Some(init) = &declarator.init {
                        if let Some((resolved, _)) = resolve_expression(init, program, used) {
                            used.push(stmt.span());
                            return Some((resolved, Some(name.to_string())));
                        }
                    }
                }
            }
            Statement::ExpressionStatement(expr_stmt) => {
                if let Expression::AssignmentExpression(assign) = &expr_stmt.expression {
                    if assignment_target_name(&assign.left) == Some(name) {
                        if let Some((resolved, _)) = resolve_expression(&assign.right, program, used)
                        {
                            used.push(stmt.span());
                            return Some((resolved, Some(name.to_string())));
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn resolve_default_export<'r, 'a>(
    program: &'r Program<'a>,
    used: &mut Vec<Span>,
) -> Option<(Resolved<'r, 'a>, Option<String>)> {
    for stmt in &program.body {
        let Statement::ExportDefaultDeclaration(export) = stmt else {
            continue;
        };
        let resolved = match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => Some((
                Resolved::Function(func),
                func.id.as_ref().map(|id| id.name.to_string()),
            )),
            kind => kind
                .as_expression()
                .and_then(|expr| resolve_expression(expr, program, used)),
        };
        if resolved.is_some() {
            used.push(stmt.span());
        }
        return resolved;
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// RETURN SHAPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Finds returns in the component body outside nested functions.
struct ReturnCollector {
    spans: Vec<Span>,
}

impl<'a> Visit<'a> for ReturnCollector {
    fn visit_return_statement(&mut self, ret: &ReturnStatement<'a>) {
        self.spans.push(ret.span);
        walk::walk_return_statement(self, ret);
    }

    fn visit_function(&mut self, _func: &Function<'a>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'a>) {}

    fn visit_class(&mut self, _class: &Class<'a>) {}
}

fn check_return_shape(unit: &ComponentUnit<'_>, ctx: &CompileContext) -> Result<(), CompileError> {
    let terminal = match unit.statements().last() {
        Some(Statement::ReturnStatement(ret)) => ret,
        Some(other) => {
            return Err(ctx.structural(
                ERR_RETURN_SHAPE,
                "The component function must end with a return statement",
                other.span(),
            ))
        }
        None => {
            return Err(ctx.structural(
                ERR_RETURN_SHAPE,
                "The component function must end with a return statement",
                unit.span,
            ))
        }
    };

    match &terminal.argument {
        Some(Expression::JSXElement(_) | Expression::JSXFragment(_) | Expression::Identifier(_)) => {}
        Some(other) => {
            return Err(ctx.structural(
                ERR_RETURN_SHAPE,
                "The component function must return JSX",
                other.span(),
            ))
        }
        None => {
            return Err(ctx.structural(
                ERR_RETURN_SHAPE,
                "The component function must return JSX",
                terminal.span,
            ))
        }
    }

    let mut collector = ReturnCollector { spans: Vec::new() };
    for stmt in unit.statements() {
        collector.visit_statement(stmt);
    }
    if let Some(span) = collector.spans.into_iter().find(|span| *span != terminal.span) {
        return Err(ctx.structural(
            ERR_RETURN_SHAPE,
            "The component may only return once, at the end of its body",
            span,
        ));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn locate_component<'a>(
    program: &mut Program<'a>,
    factory: &AstFactory<'a>,
    ctx: &CompileContext,
) -> Result<ComponentUnit<'a>, CompileError> {
    let mut used = Vec::new();
    let (span, name, params, mut body, concise) = {
        let (resolved, name) = resolve_default_export(program, &mut used).ok_or_else(|| {
            ctx.structural(
                ERR_NO_EXPORT,
                "Input file has to export a function that returns JSX",
                program.span,
            )
        })?;
        match resolved {
            Resolved::Function(func) => {
                let body = func.body.as_ref().ok_or_else(|| {
                    ctx.structural(ERR_NO_EXPORT, "The exported function has no body", func.span)
                })?;
                (
                    func.span,
                    name,
                    func.params.clone_in(factory.allocator),
                    body.clone_in(factory.allocator),
                    None,
                )
            }
            Resolved::Arrow(arrow) => (
                arrow.span,
                name,
                arrow.params.clone_in(factory.allocator),
                arrow.body.clone_in(factory.allocator),
                concise_body(arrow).map(|expr| expr.clone_in(factory.allocator)),
            ),
        }
    };

    // `() => <div/>` gets an explicit terminal return.
    if let Some(expr) = concise {
        body.statements.clear();
        body.statements.push(factory.return_statement(expr)?);
    }

    program
        .body
        .retain(|stmt| !used.contains(&stmt.span()));

    let unit = ComponentUnit {
        name,
        span,
        params,
        body,
        export_statements: used,
    };
    check_return_shape(&unit, ctx)?;

    debug!(
        component = unit.name.as_deref().unwrap_or("<anonymous>"),
        statements = unit.statements().len(),
        removed = unit.export_statements.len(),
        "located component"
    );
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_module, CompileOptions};
    use oxc_allocator::Allocator;

    fn locate(src: &str) -> Result<(Option<String>, usize, usize), CompileError> {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let mut program = parse_module(&allocator, src, &options)?;
        let factory = AstFactory::new(&allocator, options.source_type());
        let ctx = CompileContext::new(src, &options);
        let unit = locate_component(&mut program, &factory, &ctx)?;
        let statements = unit.statements().len();
        Ok((unit.name, statements, program.body.len()))
    }

    #[test]
    fn test_locates_direct_arrow_export() {
        let (name, stmts, rest) =
            locate("import React from 'react';\nexport default () => { const a = 1; return <div/>; };")
                .unwrap();
        assert_eq!(name, None);
        assert_eq!(stmts, 2);
        assert_eq!(rest, 1);
    }

    #[test]
    fn test_locates_identifier_bound_to_declaration() {
        let (name, _, rest) =
            locate("const App = ({ a }) => { return <p>{a}</p>; };\nlet other;\nexport default App;")
                .unwrap();
        assert_eq!(name.as_deref(), Some("App"));
        assert_eq!(rest, 1);
    }

    #[test]
    fn test_locates_function_declaration_and_assignment() {
        let (name, _, _) =
            locate("function App() { return <p/>; }\nexport default App;").unwrap();
        assert_eq!(name.as_deref(), Some("App"));

        let (name, _, rest) =
            locate("let App;\nApp = function () { return <p/>; };\nexport default App;").unwrap();
        assert_eq!(name.as_deref(), Some("App"));
        assert_eq!(rest, 1);
    }

    #[test]
    fn test_unwraps_memo_and_concise_arrow() {
        let (_, stmts, _) = locate("export default React.memo(() => <div/>);").unwrap();
        assert_eq!(stmts, 1);
    }

    #[test]
    fn test_missing_export_is_structural() {
        let err = locate("const a = 1;").unwrap_err();
        assert!(err.is_structural());
        assert_eq!(err.message(), "Input file has to export a function that returns JSX");
    }

    #[test]
    fn test_non_markup_return_is_structural() {
        let err = locate("export default () => { return 42; };").unwrap_err();
        assert_eq!(err.code(), ERR_RETURN_SHAPE);

        let err = locate("export default () => { if (x) { return <a/>; } return <b/>; };")
            .unwrap_err();
        assert_eq!(err.code(), ERR_RETURN_SHAPE);

        let err = locate("export default () => { const a = 1; };").unwrap_err();
        assert_eq!(err.code(), ERR_RETURN_SHAPE);
    }
}
