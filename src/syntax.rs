//! Shape queries over oxc nodes shared by the passes.

use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_span::Span;

/// Namespace object hooks may be reached through (`React.useState`).
pub const FRAMEWORK_NAMESPACE: &str = "React";
/// Import source dropped from the output.
pub const FRAMEWORK_MODULE: &str = "react";

pub const USE_STATE: &str = "useState";
pub const USE_REDUCER: &str = "useReducer";
pub const USE_MEMO: &str = "useMemo";
pub const USE_CALLBACK: &str = "useCallback";
pub const MEMO: &str = "memo";

pub fn is_effect_hook(name: &str) -> bool {
    matches!(name, "useEffect" | "useLayoutEffect")
}

/// Name of a hook-style callee: `name` or `React.name`.
pub fn callee_name<'b>(callee: &'b Expression<'_>) -> Option<&'b str> {
    match callee {
        Expression::Identifier(ident) => Some(ident.name.as_str()),
        Expression::StaticMemberExpression(member) => match &member.object {
            Expression::Identifier(object) if object.name.as_str() == FRAMEWORK_NAMESPACE => {
                Some(member.property.name.as_str())
            }
            _ => None,
        },
        _ => None,
    }
}

pub fn call_hook_name<'b>(call: &'b CallExpression<'_>) -> Option<&'b str> {
    callee_name(&call.callee)
}

pub fn is_hook_call(expr: &Expression<'_>, hook: &str) -> bool {
    matches!(expr, Expression::CallExpression(call) if call_hook_name(call) == Some(hook))
}

pub fn is_function_like(expr: &Expression<'_>) -> bool {
    matches!(
        expr,
        Expression::ArrowFunctionExpression(_) | Expression::FunctionExpression(_)
    )
}

pub fn is_jsx(expr: &Expression<'_>) -> bool {
    matches!(expr, Expression::JSXElement(_) | Expression::JSXFragment(_))
}

pub fn first_argument<'b, 'a>(call: &'b CallExpression<'a>) -> Option<&'b Expression<'a>> {
    call.arguments.first().and_then(Argument::as_expression)
}

/// Expression body of a concise arrow (`x => x + 1`).
pub fn concise_body<'b, 'a>(arrow: &'b ArrowFunctionExpression<'a>) -> Option<&'b Expression<'a>> {
    if !arrow.expression {
        return None;
    }
    match arrow.body.statements.first() {
        Some(Statement::ExpressionStatement(stmt)) => Some(&stmt.expression),
        _ => None,
    }
}

/// `X.map(callback)`: returns `(X, callback)` when the callee is a `.map` member access
/// with exactly one function-shaped argument taking one parameter.
pub fn map_call_parts<'b, 'a>(
    call: &'b CallExpression<'a>,
) -> Option<(&'b Expression<'a>, &'b Expression<'a>)> {
    let Expression::StaticMemberExpression(member) = &call.callee else {
        return None;
    };
    if member.property.name.as_str() != "map" || call.arguments.len() != 1 {
        return None;
    }
    let callback = first_argument(call)?;
    let params = match callback {
        Expression::ArrowFunctionExpression(arrow) => &arrow.params,
        Expression::FunctionExpression(func) => &func.params,
        _ => return None,
    };
    if params.items.len() != 1 || params.rest.is_some() {
        return None;
    }
    Some((&member.object, callback))
}

/// Collects every name a binding pattern introduces.
pub fn binding_names(pattern: &BindingPattern<'_>, names: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => names.push(id.name.to_string()),
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                binding_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for pattern in arr.elements.iter().flatten() {
                binding_names(pattern, names);
            }
            if let Some(rest) = &arr.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assign) => binding_names(&assign.left, names),
    }
}

pub fn binding_identifier_name<'b>(pattern: &'b BindingPattern<'_>) -> Option<&'b str> {
    match pattern {
        BindingPattern::BindingIdentifier(id) => Some(id.name.as_str()),
        _ => None,
    }
}

pub fn assignment_target_name<'b>(target: &'b AssignmentTarget<'_>) -> Option<&'b str> {
    match target {
        AssignmentTarget::AssignmentTargetIdentifier(id) => Some(id.name.as_str()),
        _ => None,
    }
}

pub fn property_key_name<'b>(key: &'b PropertyKey<'_>) -> Option<&'b str> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.as_str()),
        PropertyKey::StringLiteral(lit) => Some(lit.value.as_str()),
        _ => None,
    }
}

/// Finds the first call to a hook accepted by `accepts`.
pub struct HookFinder<F: Fn(&str) -> bool> {
    accepts: F,
    pub found: Option<Span>,
}

impl<F: Fn(&str) -> bool> HookFinder<F> {
    pub fn new(accepts: F) -> Self {
        Self {
            accepts,
            found: None,
        }
    }

    pub fn find_in<'a>(mut self, statements: &[Statement<'a>]) -> Option<Span> {
        for stmt in statements {
            self.visit_statement(stmt);
            if self.found.is_some() {
                break;
            }
        }
        self.found
    }
}

impl<'a, F: Fn(&str) -> bool> Visit<'a> for HookFinder<F> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if self.found.is_none() && call_hook_name(call).is_some_and(|name| (self.accepts)(name)) {
            self.found = Some(call.span);
        }
        walk::walk_call_expression(self, call);
    }
}
