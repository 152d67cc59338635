//! Node construction and printing.
//!
//! New nodes are built by parsing a small code template with the compile's
//! allocator and grafting original nodes into its `__holeN__` identifiers, so
//! grafted nodes keep their source spans. Printing goes through a scratch
//! program handed to `oxc_codegen`.

use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::ast::*;
use oxc_ast_visit::walk_mut::walk_expression;
use oxc_ast_visit::VisitMut;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::{SourceType, SPAN};

use crate::diagnostics::{CompileError, Diagnostic, ERR_INTERNAL_TEMPLATE};
use crate::parse::parse_options;

const HOLE_PREFIX: &str = "__hole";

fn hole_index(name: &str) -> Option<usize> {
    name.strip_prefix(HOLE_PREFIX)?.strip_suffix("__")?.parse().ok()
}

/// `__hole{index}__`
pub fn hole(index: usize) -> String {
    format!("{}{}__", HOLE_PREFIX, index)
}

fn template_error(template: &str) -> CompileError {
    CompileError::Structural(Diagnostic::new(
        ERR_INTERNAL_TEMPLATE,
        format!("Generated code failed to parse: `{}`", template),
        SPAN,
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOLE FILLING
// ═══════════════════════════════════════════════════════════════════════════════

struct HoleFiller<'a> {
    fills: Vec<Option<Expression<'a>>>,
}

impl<'a> VisitMut<'a> for HoleFiller<'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if let Expression::Identifier(ident) = expr {
            if let Some(fill) = hole_index(ident.name.as_str())
                .and_then(|index| self.fills.get_mut(index))
                .and_then(Option::take)
            {
                *expr = fill;
                return;
            }
        }
        walk_expression(self, expr);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AST FACTORY
// ═══════════════════════════════════════════════════════════════════════════════

pub struct AstFactory<'a> {
    pub allocator: &'a Allocator,
    source_type: SourceType,
}

impl<'a> AstFactory<'a> {
    pub fn new(allocator: &'a Allocator, source_type: SourceType) -> Self {
        Self {
            allocator,
            source_type,
        }
    }

    fn parse_program(&self, text: &str) -> Option<Program<'a>> {
        let text = self.allocator.alloc_str(text);
        let ret = Parser::new(self.allocator, text, self.source_type)
            .with_options(parse_options())
            .parse();
        if ret.errors.is_empty() {
            Some(ret.program)
        } else {
            None
        }
    }

    /// Parses `template` as one statement, replacing `__hole{i}__` with `fills[i]`.
    pub fn statement(
        &self,
        template: &str,
        fills: Vec<Expression<'a>>,
    ) -> Result<Statement<'a>, CompileError> {
        let program = self
            .parse_program(template)
            .ok_or_else(|| template_error(template))?;
        let mut stmt = program
            .body
            .into_iter()
            .next()
            .ok_or_else(|| template_error(template))?;
        let mut filler = HoleFiller {
            fills: fills.into_iter().map(Some).collect(),
        };
        filler.visit_statement(&mut stmt);
        Ok(stmt)
    }

    /// Parses `template` as one expression, replacing holes like [`Self::statement`].
    pub fn expression(
        &self,
        template: &str,
        fills: Vec<Expression<'a>>,
    ) -> Result<Expression<'a>, CompileError> {
        match self.statement(&format!("({});", template), fills)? {
            Statement::ExpressionStatement(stmt) => Ok(stmt.unbox().expression),
            _ => Err(template_error(template)),
        }
    }

    pub fn identifier(&self, name: &str) -> Result<Expression<'a>, CompileError> {
        self.expression(name, vec![])
    }

    /// `$: <stmt>`
    pub fn reactive_label(&self, stmt: Statement<'a>) -> Result<Statement<'a>, CompileError> {
        let mut labeled = self.statement("$: {}", vec![])?;
        match &mut labeled {
            Statement::LabeledStatement(label) => label.body = stmt,
            _ => return Err(template_error("$: {}")),
        }
        Ok(labeled)
    }

    /// `return <argument>;`
    pub fn return_statement(&self, argument: Expression<'a>) -> Result<Statement<'a>, CompileError> {
        let template = format!("function __component__() {{ return {}; }}", hole(0));
        match self.statement(&template, vec![argument])? {
            Statement::FunctionDeclaration(mut func) => func
                .body
                .take()
                .and_then(|mut body| body.statements.pop())
                .ok_or_else(|| template_error(&template)),
            _ => Err(template_error(&template)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRINTING
    // ═══════════════════════════════════════════════════════════════════════════

    fn codegen_options() -> CodegenOptions {
        CodegenOptions {
            single_quote: true,
            ..CodegenOptions::default()
        }
    }

    fn scratch_program(&self) -> Program<'a> {
        Parser::new(self.allocator, "", self.source_type)
            .parse()
            .program
    }

    pub fn print_statement(&self, stmt: &Statement<'a>) -> String {
        let mut program = self.scratch_program();
        program.body.push(stmt.clone_in(self.allocator));
        Codegen::new()
            .with_options(Self::codegen_options())
            .build(&program)
            .code
            .trim_end()
            .to_string()
    }

    pub fn print_expression(&self, expr: &Expression<'a>) -> String {
        let Ok(stmt) = self.statement("0;", vec![]) else {
            return String::new();
        };
        let mut program = self.scratch_program();
        program.body.push(stmt);
        if let Some(Statement::ExpressionStatement(holder)) = program.body.first_mut() {
            holder.expression = expr.clone_in(self.allocator);
        }
        let code = Codegen::new()
            .with_options(Self::codegen_options())
            .build(&program)
            .code;
        let code = code.trim_end();
        code.strip_suffix(';').unwrap_or(code).to_string()
    }

    /// Prints a binding pattern as it would appear on the left of `=`.
    pub fn print_binding_pattern(&self, pattern: &BindingPattern<'a>) -> String {
        let template = format!("let {};", hole(0));
        let Ok(mut stmt) = self.statement(&template, vec![]) else {
            return String::new();
        };
        if let Statement::VariableDeclaration(decl) = &mut stmt {
            if let Some(declarator) = decl.declarations.first_mut() {
                declarator.id = pattern.clone_in(self.allocator);
            }
        }
        let code = self.print_statement(&stmt);
        let code = code.strip_prefix("let ").unwrap_or(&code);
        code.strip_suffix(';').unwrap_or(code).to_string()
    }
}
