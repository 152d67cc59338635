//! State Cell Extractor
//!
//! Turns `const [value, setValue] = useState(init)` into `let value = init`,
//! rewrites setter calls into assignments and records setters that escape as
//! values so the emitter can synthesize them.

use oxc_allocator::CloneIn;
use oxc_ast::ast::*;
use oxc_ast_visit::walk_mut::{walk_arrow_function_expression, walk_expression, walk_function};
use oxc_ast_visit::VisitMut;
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;
use tracing::{debug, trace};

use crate::builder::{hole, AstFactory};
use crate::context::{CompileContext, SetterRegistry, StateCell};
use crate::diagnostics::{CompileError, ERR_STATE_SHAPE};
use crate::locate::ComponentUnit;
use crate::reactive::{bind_statement, propagate};
use crate::syntax::{call_hook_name, first_argument, is_function_like, HookFinder, USE_STATE};

// ═══════════════════════════════════════════════════════════════════════════════
// DECLARATIONS
// ═══════════════════════════════════════════════════════════════════════════════

struct StateDeclaration<'a> {
    value: String,
    setter: String,
    initializer: Option<Expression<'a>>,
}

fn unsupported_shape(ctx: &CompileContext, span: Span) -> CompileError {
    ctx.unsupported(
        ERR_STATE_SHAPE,
        "useState must be destructured into a [value, setter] pair",
        span,
    )
}

/// Recognizes a top-level `const [value, setValue] = useState(init)`.
fn state_declaration<'a>(
    decl: &VariableDeclaration<'a>,
    factory: &AstFactory<'a>,
    ctx: &CompileContext,
) -> Result<Option<StateDeclaration<'a>>, CompileError> {
    let Some(declarator) = decl.declarations.iter().find(|d| {
        matches!(&d.init, Some(Expression::CallExpression(call)) if call_hook_name(call) == Some(USE_STATE))
    }) else {
        return Ok(None);
    };
    if decl.declarations.len() != 1 {
        return Err(unsupported_shape(ctx, decl.span));
    }
    let Some(Expression::CallExpression(call)) = &declarator.init else {
        return Ok(None);
    };

    let BindingPattern::ArrayPattern(pair) = &declarator.id else {
        return Err(unsupported_shape(ctx, declarator.span));
    };
    let names: Vec<&str> = pair
        .elements
        .iter()
        .filter_map(|element| match element {
            Some(BindingPattern::BindingIdentifier(id)) => Some(id.name.as_str()),
            _ => None,
        })
        .collect();
    if pair.elements.len() != 2 || names.len() != 2 || pair.rest.is_some() {
        return Err(unsupported_shape(ctx, declarator.span));
    }

    Ok(Some(StateDeclaration {
        value: names[0].to_string(),
        setter: names[1].to_string(),
        initializer: first_argument(call).map(|init| init.clone_in(factory.allocator)),
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTER CALLS
// ═══════════════════════════════════════════════════════════════════════════════

struct SetterRewriter<'f, 'a> {
    factory: &'f AstFactory<'a>,
    setters: SetterRegistry,
    function_depth: usize,
    label_depth: usize,
    /// Set when a rewrite happened outside any nested function or label.
    top_level_rewrite: bool,
    escaped: Vec<String>,
    error: Option<CompileError>,
}

impl<'f, 'a> SetterRewriter<'f, 'a> {
    fn setter_value(&self, call: &CallExpression<'a>) -> Option<String> {
        match &call.callee {
            Expression::Identifier(ident) => {
                self.setters.value_of(ident.name.as_str()).map(str::to_string)
            }
            _ => None,
        }
    }

    /// `setS(x)` -> `s = x`, `setS(fn)` -> `s = fn(s)`.
    fn lower_call(
        &self,
        value: &str,
        call: &CallExpression<'a>,
    ) -> Result<Expression<'a>, CompileError> {
        match first_argument(call) {
            Some(arg) if is_function_like(arg) => self.factory.expression(
                &format!("{0} = {1}({0})", value, hole(0)),
                vec![arg.clone_in(self.factory.allocator)],
            ),
            Some(arg) => self.factory.expression(
                &format!("{} = {}", value, hole(0)),
                vec![arg.clone_in(self.factory.allocator)],
            ),
            None => self.factory.expression(&format!("{} = undefined", value), vec![]),
        }
    }
}

impl<'f, 'a> VisitMut<'a> for SetterRewriter<'f, 'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        let lowered = match expr {
            Expression::CallExpression(call) => match self.setter_value(call) {
                Some(value) => {
                    for arg in call.arguments.iter_mut() {
                        self.visit_argument(arg);
                    }
                    Some(self.lower_call(&value, call))
                }
                None => None,
            },
            _ => None,
        };
        match lowered {
            Some(Ok(assignment)) => {
                trace!("rewrote setter call");
                *expr = assignment;
                if self.function_depth == 0 && self.label_depth == 0 {
                    self.top_level_rewrite = true;
                }
            }
            Some(Err(error)) => {
                self.error.get_or_insert(error);
            }
            None => walk_expression(self, expr),
        }
    }

    fn visit_identifier_reference(&mut self, ident: &mut IdentifierReference<'a>) {
        let name = ident.name.as_str();
        if self.setters.value_of(name).is_some() && !self.escaped.iter().any(|s| s == name) {
            self.escaped.push(name.to_string());
        }
    }

    fn visit_function(&mut self, func: &mut Function<'a>, flags: ScopeFlags) {
        self.function_depth += 1;
        walk_function(self, func, flags);
        self.function_depth -= 1;
    }

    fn visit_arrow_function_expression(&mut self, arrow: &mut ArrowFunctionExpression<'a>) {
        self.function_depth += 1;
        walk_arrow_function_expression(self, arrow);
        self.function_depth -= 1;
    }

    fn visit_labeled_statement(&mut self, stmt: &mut LabeledStatement<'a>) {
        self.label_depth += 1;
        self.visit_statement(&mut stmt.body);
        self.label_depth -= 1;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn extract_state<'a>(
    unit: &mut ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &mut CompileContext,
) -> Result<(), CompileError> {
    for index in 0..unit.statements().len() {
        let found = match &unit.statements()[index] {
            Statement::VariableDeclaration(decl) => state_declaration(decl, factory, ctx)?,
            _ => None,
        };
        let Some(StateDeclaration {
            value,
            setter,
            initializer,
        }) = found
        else {
            continue;
        };

        let printed = initializer.as_ref().map(|init| factory.print_expression(init));
        let replacement = match initializer {
            Some(init) => factory.statement(&format!("let {} = {};", value, hole(0)), vec![init])?,
            None => factory.statement(&format!("let {};", value), vec![])?,
        };
        unit.statements_mut()[index] = replacement;

        ctx.exempt.insert(index);
        ctx.setters.register(&setter, &value);
        ctx.tracked.insert(value.clone());
        ctx.state.push(StateCell {
            value_name: value,
            setter_name: setter,
            initializer: printed,
            declaration: index,
        });
    }

    // Anything left is a state hook we do not know how to lower.
    if let Some(span) = HookFinder::new(|name| name == USE_STATE).find_in(unit.statements()) {
        return Err(unsupported_shape(ctx, span));
    }

    if !ctx.setters.is_empty() {
        let mut rewriter = SetterRewriter {
            factory,
            setters: ctx.setters.clone(),
            function_depth: 0,
            label_depth: 0,
            top_level_rewrite: false,
            escaped: Vec::new(),
            error: None,
        };
        let return_index = unit.return_index();
        let mut wrap = Vec::new();
        for index in 0..unit.statements().len() {
            rewriter.top_level_rewrite = false;
            rewriter.visit_statement(&mut unit.statements_mut()[index]);
            if let Some(error) = rewriter.error.take() {
                return Err(error);
            }
            if rewriter.top_level_rewrite && index != return_index {
                wrap.push(index);
            }
        }
        for setter in std::mem::take(&mut rewriter.escaped) {
            ctx.synthesize_setter(&setter);
        }
        for index in wrap {
            bind_statement(unit.statements_mut(), index, ctx, factory)?;
        }
    }

    let bound = propagate(unit, ctx, factory)?;
    debug!(
        cells = ctx.state.len(),
        synthesized = ctx.synthesized_setters.len(),
        bound,
        "extracted state"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate_component;
    use crate::parse::{parse_module, CompileOptions};
    use oxc_allocator::Allocator;

    fn run(src: &str) -> Result<(Vec<String>, Vec<String>), CompileError> {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let mut program = parse_module(&allocator, src, &options)?;
        let factory = AstFactory::new(&allocator, options.source_type());
        let mut ctx = CompileContext::new(src, &options);
        let mut unit = locate_component(&mut program, &factory, &ctx)?;
        extract_state(&mut unit, &factory, &mut ctx)?;
        let printed = unit
            .statements()
            .iter()
            .map(|stmt| factory.print_statement(stmt))
            .collect();
        Ok((printed, ctx.synthesized_setters.clone()))
    }

    #[test]
    fn test_state_declarations_become_lets() {
        let (out, _) = run(
            "export default () => { const [state1, setState1] = useState('gears of war 4'); const [state2, setState2] = React.useState(); return <div/>; };",
        )
        .unwrap();
        assert_eq!(out[0], "let state1 = 'gears of war 4';");
        assert_eq!(out[1], "let state2;");
    }

    #[test]
    fn test_dependents_become_reactive_but_not_the_declaration() {
        let (out, _) = run(
            "export default () => { const [a, setA] = useState(1); const b = a + 1; const c = 'x'; return <div/>; };",
        )
        .unwrap();
        assert_eq!(out[0], "let a = 1;");
        assert_eq!(out[1], "$: b = a + 1;");
        assert_eq!(out[2], "const c = 'x';");
    }

    #[test]
    fn test_setter_calls_become_assignments() {
        let (out, synthesized) = run(
            "export default () => { const [n, setN] = useState(0); function inc() { setN(n + 1); } const reset = () => setN(prev => 0); return <button onClick={setN}>{n}</button>; };",
        )
        .unwrap();
        assert!(out[1].contains("n = n + 1"));
        assert!(!out[1].contains("setN("));
        assert!(out[2].contains("n = ((prev) => 0)(n)") || out[2].contains("n = (prev => 0)(n)"));
        assert_eq!(synthesized, vec!["setN".to_string()]);
    }

    #[test]
    fn test_top_level_setter_call_is_wrapped() {
        let (out, _) = run(
            "export default () => { const [n, setN] = useState(0); setN(5); return <div/>; };",
        )
        .unwrap();
        assert_eq!(out[1], "$: n = 5;");
    }

    #[test]
    fn test_non_destructured_state_is_unsupported() {
        let err = run("export default () => { const s = useState(0); return <div>{s[0]}</div>; };")
            .unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(err.code(), ERR_STATE_SHAPE);

        let err = run(
            "export default () => { function f() { const [a, b] = useState(0); } return <div/>; };",
        )
        .unwrap_err();
        assert!(err.is_unsupported());
    }
}
