//! Prop Binder
//!
//! Derives the component's prop names from its parameter and makes every
//! top-level statement that reads a prop reactive.

use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit, VisitMut};
use tracing::debug;

use crate::builder::AstFactory;
use crate::context::{CompileContext, ParamForm};
use crate::diagnostics::CompileError;
use crate::locate::ComponentUnit;
use crate::reactive::propagate;
use crate::syntax::{binding_names, property_key_name};

/// Reference the whole-object parameter is renamed to.
pub const PROPS_OBJECT: &str = "$$props";
/// Object holding props not named by a destructured parameter.
pub const REST_PROPS: &str = "$$restProps";

// ═══════════════════════════════════════════════════════════════════════════════
// WHOLE-OBJECT FORM
// ═══════════════════════════════════════════════════════════════════════════════

struct PropsObjectRenamer<'n> {
    param: &'n str,
}

impl<'a, 'n> VisitMut<'a> for PropsObjectRenamer<'n> {
    fn visit_identifier_reference(&mut self, ident: &mut IdentifierReference<'a>) {
        if ident.name.as_str() == self.param {
            ident.name = PROPS_OBJECT.into();
        }
    }
}

/// Collects fields read from the props object through destructuring or member access.
#[derive(Default)]
struct PropsFieldCollector {
    fields: Vec<String>,
}

fn is_props_object(expr: &Expression<'_>) -> bool {
    matches!(expr, Expression::Identifier(ident) if ident.name.as_str() == PROPS_OBJECT)
}

impl<'a> Visit<'a> for PropsFieldCollector {
    fn visit_variable_declarator(&mut self, declarator: &VariableDeclarator<'a>) {
        if let (BindingPattern::ObjectPattern(obj), Some(init)) = (&declarator.id, &declarator.init)
        {
            if is_props_object(init) {
                for prop in &obj.properties {
                    if let Some(key) = property_key_name(&prop.key) {
                        self.fields.push(key.to_string());
                    }
                }
            }
        }
        walk::walk_variable_declarator(self, declarator);
    }

    fn visit_static_member_expression(&mut self, member: &StaticMemberExpression<'a>) {
        if is_props_object(&member.object) {
            self.fields.push(member.property.name.to_string());
        }
        walk::walk_static_member_expression(self, member);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESTRUCTURED FORM
// ═══════════════════════════════════════════════════════════════════════════════

/// Alias statements for destructured props whose local binding differs from
/// the prop name, e.g. `{ title: heading }` needs `$: heading = title;`.
fn destructured_props<'a>(
    obj: &ObjectPattern<'a>,
    factory: &AstFactory<'a>,
    ctx: &mut CompileContext,
) -> Result<Vec<Statement<'a>>, CompileError> {
    let mut aliases = Vec::new();
    for prop in &obj.properties {
        let Some(key) = property_key_name(&prop.key) else {
            continue;
        };
        let (target, default) = match &prop.value {
            BindingPattern::AssignmentPattern(assign) => {
                (&assign.left, Some(factory.print_expression(&assign.right)))
            }
            other => (other, None),
        };
        ctx.props.add_field(key, default);
        ctx.tracked.insert(key.to_string());

        match target {
            BindingPattern::BindingIdentifier(id) if id.name.as_str() == key => {}
            BindingPattern::BindingIdentifier(id) => {
                aliases.push(factory.statement(&format!("$: {} = {};", id.name, key), vec![])?);
                ctx.tracked.insert(id.name.to_string());
            }
            pattern => {
                let printed = factory.print_binding_pattern(pattern);
                aliases.push(factory.statement(&format!("$: ({} = {});", printed, key), vec![])?);
                let mut locals = Vec::new();
                binding_names(pattern, &mut locals);
                ctx.tracked.extend(locals);
            }
        }
    }
    if let Some(rest) = &obj.rest {
        let mut locals = Vec::new();
        binding_names(&rest.argument, &mut locals);
        if let Some(name) = locals.first() {
            aliases.push(factory.statement(&format!("$: {} = {};", name, REST_PROPS), vec![])?);
            ctx.tracked.insert(name.clone());
        }
    }
    Ok(aliases)
}

fn param_form(params: &FormalParameters<'_>) -> ParamForm {
    let Some(first) = params.items.first() else {
        return ParamForm::None;
    };
    let pattern = match &first.pattern {
        BindingPattern::AssignmentPattern(assign) => &assign.left,
        other => other,
    };
    match pattern {
        BindingPattern::ObjectPattern(obj) => ParamForm::Destructured {
            names: obj
                .properties
                .iter()
                .filter_map(|prop| property_key_name(&prop.key).map(str::to_string))
                .collect(),
        },
        BindingPattern::BindingIdentifier(id) => ParamForm::WholeObject {
            param: id.name.to_string(),
        },
        _ => ParamForm::None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn bind_props<'a>(
    unit: &mut ComponentUnit<'a>,
    factory: &AstFactory<'a>,
    ctx: &mut CompileContext,
) -> Result<(), CompileError> {
    let form = param_form(&unit.params);
    match &form {
        ParamForm::Destructured { .. } => {
            let pattern = unit.params.items.first().map(|param| match &param.pattern {
                BindingPattern::AssignmentPattern(assign) => &assign.left,
                other => other,
            });
            let aliases = match pattern {
                Some(BindingPattern::ObjectPattern(obj)) => destructured_props(obj, factory, ctx)?,
                _ => Vec::new(),
            };
            // Aliases lead the body and are already reactive.
            for (offset, alias) in aliases.into_iter().enumerate() {
                unit.statements_mut().insert(offset, alias);
                ctx.compiled.insert(offset);
            }
        }
        ParamForm::WholeObject { param } => {
            let mut renamer = PropsObjectRenamer { param };
            for stmt in unit.statements_mut().iter_mut() {
                renamer.visit_statement(stmt);
            }
            let mut collector = PropsFieldCollector::default();
            for stmt in unit.statements() {
                collector.visit_statement(stmt);
            }
            for field in &collector.fields {
                ctx.props.add_field(field, None);
            }
            ctx.tracked.insert(PROPS_OBJECT.to_string());
        }
        ParamForm::None => {}
    }
    ctx.props.form = form;

    let bound = propagate(unit, ctx, factory)?;
    debug!(props = ?ctx.props.names(), bound, "bound props");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::locate_component;
    use crate::parse::{parse_module, CompileOptions};
    use oxc_allocator::Allocator;

    fn run(src: &str) -> (Vec<String>, Vec<String>, ParamForm) {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let mut program = parse_module(&allocator, src, &options).unwrap();
        let factory = AstFactory::new(&allocator, options.source_type());
        let mut ctx = CompileContext::new(src, &options);
        let mut unit = locate_component(&mut program, &factory, &ctx).unwrap();
        bind_props(&mut unit, &factory, &mut ctx).unwrap();
        let printed = unit
            .statements()
            .iter()
            .map(|stmt| factory.print_statement(stmt))
            .collect();
        (printed, ctx.props.names(), ctx.props.form.clone())
    }

    #[test]
    fn test_destructured_params_are_props() {
        let (out, props, form) = run(
            "export default ({ comment, date }) => { const title = `Title: ${comment}`; const randomVar = 'hello'; return <div/>; };",
        );
        assert_eq!(props, vec!["comment", "date"]);
        assert!(matches!(form, ParamForm::Destructured { .. }));
        assert_eq!(out[0], "$: title = `Title: ${comment}`;");
        assert_eq!(out[1], "const randomVar = 'hello';");
    }

    #[test]
    fn test_renamed_and_rest_props_get_aliases() {
        let (out, props, _) = run(
            "export default ({ title: heading, size = 10, ...rest }) => { const h = heading.trim(); return <div/>; };",
        );
        assert_eq!(props, vec!["title", "size"]);
        assert_eq!(out[0], "$: heading = title;");
        assert_eq!(out[1], "$: rest = $$restProps;");
        assert!(out[2].starts_with("$: h = heading.trim()"));
    }

    #[test]
    fn test_whole_object_param_is_renamed_and_scanned() {
        let (out, props, form) = run(
            "export default (props) => { const { a, b } = props; const c = props.c; const d = a + 1; return <div>{props.e}</div>; };",
        );
        assert_eq!(
            form,
            ParamForm::WholeObject {
                param: "props".to_string()
            }
        );
        assert_eq!(props, vec!["a", "b", "c", "e"]);
        assert!(out[0].starts_with("$: ({"));
        assert!(out[1].starts_with("$: c = $$props.c"));
        assert!(out[2].starts_with("$: d = a + 1"));
        assert!(out[3].contains("$$props.e"));
    }

    #[test]
    fn test_no_params_is_fine() {
        let (out, props, form) =
            run("export default () => { const randomVar = 'hello'; return <div/>; };");
        assert!(props.is_empty());
        assert_eq!(form, ParamForm::None);
        assert_eq!(out[0], "const randomVar = 'hello';");
    }

    #[test]
    fn test_state_initializer_reads_are_not_reactive() {
        let (out, _, _) = run(
            "export default ({ start }) => { const [n, setN] = useState(start); return <div/>; };",
        );
        assert!(out[0].starts_with("const [n, setN] = useState(start)"));
    }
}
