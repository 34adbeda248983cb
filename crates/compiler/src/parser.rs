//! Recursive-descent parser for BreadLang source text.
//!
//! Tokenizes the whole source up front (a flat `Vec<Token>`, each carrying
//! its line/column) and then parses by walking that buffer with a `pos`
//! cursor and `check`/`consume`/`advance` helpers — the same shape as a
//! concatenative-language word-definition parser, just with an
//! operator-precedence expression grammar and block-structured statements
//! bolted on. The grammar itself (precedence chain, the single-character
//! comparison encoding, `[:]` empty dicts, `Name{field: expr}` literals,
//! optional chaining) comes straight from a hand-rolled character-stream
//! parser that threads a `const char**` cursor through every call; fusing
//! lexing into parsing was workable there because the source had no real
//! token classes to distinguish. Buffering tokens first reads better in
//! Rust and sidesteps re-deriving "is this run of digits a number or the
//! start of an identifier" at every call site.

use crate::ast::{
    AssignTarget, ClassDecl, Expr, FieldInit, FunctionDecl, Literal, Param, Program,
    SourceLocation, Stmt, StructDecl, VarKind,
};
use bread_core::error::{BreadError, ErrorCategory};
use bread_core::types::TypeDescriptor;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct Token {
    text: String,
    line: usize,
    column: usize,
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: Rc<PathBuf>,
}

impl Parser {
    pub fn new(source: &str, file: impl Into<PathBuf>) -> Self {
        Parser {
            tokens: tokenize(source),
            pos: 0,
            file: Rc::new(file.into()),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, BreadError> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_stmt()?);
        }
        Ok(Program::new(statements))
    }

    // ---- statements ---------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, BreadError> {
        let loc = self.loc();
        if self.consume("import") {
            return self.parse_import(loc);
        }
        if self.consume("export") {
            return self.parse_export(loc);
        }
        if self.consume("let") {
            return self.parse_var_decl(VarKind::Let, loc);
        }
        if self.consume("var") {
            return self.parse_var_decl(VarKind::Var, loc);
        }
        if self.consume("const") {
            return self.parse_var_decl(VarKind::Const, loc);
        }
        if self.consume("print") {
            return self.parse_print(loc);
        }
        if self.consume("if") {
            return self.parse_if(loc);
        }
        if self.consume("while") {
            return self.parse_while(loc);
        }
        if self.consume("for") {
            return self.parse_for(loc);
        }
        if self.consume("break") {
            return Ok(Stmt::Break { loc });
        }
        if self.consume("continue") {
            return Ok(Stmt::Continue { loc });
        }
        if self.consume("return") {
            return self.parse_return(loc);
        }
        if self.consume("def") {
            return Ok(Stmt::FuncDecl(self.parse_function_decl(loc)?));
        }
        if self.consume("struct") {
            return self.parse_struct_decl(loc);
        }
        if self.consume("class") {
            return self.parse_class_decl(loc);
        }
        self.parse_assign_or_expr_stmt(loc)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, BreadError> {
        self.expect("{")?;
        let mut statements = Vec::new();
        while !self.check("}") {
            if self.is_at_end() {
                return Err(self.error_here(ErrorCategory::SyntaxError, "missing closing '}'"));
            }
            statements.push(self.parse_stmt()?);
        }
        self.advance();
        Ok(statements)
    }

    fn parse_import(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let path = self.parse_string_text("module path")?;
        let alias = if self.consume("as") {
            Some(self.expect_ident("module alias")?)
        } else {
            None
        };
        Ok(Stmt::Import { path, alias, loc })
    }

    fn parse_export(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let name = self.expect_ident("exported name")?;
        Ok(Stmt::Export { name, loc })
    }

    fn parse_var_decl(&mut self, kind: VarKind, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let name = self.expect_ident("variable name")?;
        // The annotation is optional; when absent the analyzer infers the
        // declared type from `init` and records that as this variable's type.
        let declared_type = if self.consume(":") {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        self.expect("=")?;
        let init = self.parse_expression()?;
        Ok(Stmt::VarDecl { kind, name, declared_type, init, loc })
    }

    fn parse_print(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        self.expect("(")?;
        let expr = self.parse_expression()?;
        self.expect(")")?;
        Ok(Stmt::Print { expr, loc })
    }

    fn parse_if(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let cond = self.parse_expression()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.consume("else") {
            if self.check("if") {
                let nested_loc = self.loc();
                self.advance();
                Some(vec![self.parse_if(nested_loc)?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, else_branch, loc })
    }

    fn parse_while(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, loc })
    }

    fn parse_for(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let var_name = self.expect_ident("loop variable")?;
        if !self.consume("in") {
            return Err(self.error_here(ErrorCategory::SyntaxError, "expected 'in' in for-loop"));
        }
        let iter = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::For { var_name, iter, body, loc })
    }

    fn parse_return(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        if self.check("}") || self.is_at_end() {
            return Ok(Stmt::Return { value: None, loc });
        }
        let value = self.parse_expression()?;
        Ok(Stmt::Return { value: Some(value), loc })
    }

    fn parse_function_decl(&mut self, loc: SourceLocation) -> Result<FunctionDecl, BreadError> {
        let name = self.expect_ident("function name")?;
        let params = self.parse_param_list()?;
        let return_type = if self.consume("->") {
            Some(self.parse_type_annotation()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(FunctionDecl { name, params, return_type, body, loc })
    }

    /// A parameter without a default after one with a default is a syntax
    /// error (required-then-optional ordering only).
    fn parse_param_list(&mut self) -> Result<Vec<Param>, BreadError> {
        self.expect("(")?;
        let mut params = Vec::new();
        let mut seen_default = false;
        while !self.check(")") {
            let name = self.expect_ident("parameter name")?;
            self.expect(":")?;
            let type_annotation = self.parse_type_annotation()?;
            let default = if self.consume("=") {
                seen_default = true;
                Some(self.parse_expression()?)
            } else {
                if seen_default {
                    return Err(self.error_here(
                        ErrorCategory::SyntaxError,
                        "parameter without a default cannot follow one with a default",
                    ));
                }
                None
            };
            params.push(Param { name, type_annotation, default });
            if !self.consume(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    fn parse_struct_decl(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let name = self.expect_ident("struct name")?;
        self.expect("{")?;
        let fields = self.parse_field_decls()?;
        self.expect("}")?;
        Ok(Stmt::StructDecl(StructDecl { name, fields, loc }))
    }

    fn parse_class_decl(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let name = self.expect_ident("class name")?;
        let parent_name = if self.consume("extends") {
            Some(self.expect_ident("parent class name")?)
        } else {
            None
        };
        self.expect("{")?;
        let mut fields = Vec::new();
        let mut init = None;
        let mut methods = Vec::new();
        while !self.check("}") {
            if self.is_at_end() {
                return Err(self.error_here(ErrorCategory::SyntaxError, "missing closing '}' in class body"));
            }
            if self.consume("init") {
                let init_loc = self.loc();
                let params = self.parse_param_list()?;
                let body = self.parse_block()?;
                if init.is_some() {
                    return Err(self.error_here(ErrorCategory::SyntaxError, "class may declare only one 'init'"));
                }
                init = Some(FunctionDecl {
                    name: "init".to_string(),
                    params,
                    return_type: None,
                    body,
                    loc: init_loc,
                });
                continue;
            }
            if self.consume("def") {
                let method_loc = self.loc();
                let method = self.parse_function_decl(method_loc)?;
                if methods.iter().any(|m: &FunctionDecl| m.name == method.name) {
                    return Err(self.error_here(
                        ErrorCategory::SyntaxError,
                        &format!("class declares method '{}' more than once", method.name),
                    ));
                }
                methods.push(method);
                continue;
            }
            let field_name = self.expect_ident("field name")?;
            self.expect(":")?;
            let field_type = self.parse_type_annotation()?;
            fields.push((field_name, field_type));
        }
        self.expect("}")?;
        let init = init.ok_or_else(|| {
            self.error_at(&loc, ErrorCategory::SyntaxError, &format!("class '{name}' has no 'init'"))
        })?;
        Ok(Stmt::ClassDecl(ClassDecl { name, parent_name, fields, init, methods, loc }))
    }

    fn parse_field_decls(&mut self) -> Result<Vec<(String, TypeDescriptor)>, BreadError> {
        let mut fields = Vec::new();
        while !self.check("}") {
            if self.is_at_end() {
                return Err(self.error_here(ErrorCategory::SyntaxError, "missing closing '}'"));
            }
            let name = self.expect_ident("field name")?;
            self.expect(":")?;
            let type_desc = self.parse_type_annotation()?;
            fields.push((name, type_desc));
            self.consume(",");
        }
        Ok(fields)
    }

    /// Statements that don't start with a keyword: either `lhs = rhs` (or a
    /// compound `op=`) or a bare expression kept only for its side effect
    /// (e.g. `arr.append(1)`).
    fn parse_assign_or_expr_stmt(&mut self, loc: SourceLocation) -> Result<Stmt, BreadError> {
        let expr = self.parse_expression()?;
        let compound_op = if self.check("+=") {
            Some('+')
        } else if self.check("-=") {
            Some('-')
        } else if self.check("*=") {
            Some('*')
        } else if self.check("/=") {
            Some('/')
        } else if self.check("%=") {
            Some('%')
        } else {
            None
        };
        if compound_op.is_some() || self.check("=") {
            self.advance();
            let target = expr_to_assign_target(expr, self)?;
            let value = self.parse_expression()?;
            return Ok(Stmt::Assign { target, compound_op, value, loc });
        }
        Ok(Stmt::ExprStmt { expr, loc })
    }

    // ---- expressions ----------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, BreadError> {
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Result<Expr, BreadError> {
        let loc = self.loc();
        let mut left = self.parse_logical_and()?;
        while self.consume("||") {
            let right = self.parse_logical_and()?;
            left = Expr::Logical { op: '|', left: Box::new(left), right: Box::new(right), loc: loc.clone(), tag: None };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, BreadError> {
        let loc = self.loc();
        let mut left = self.parse_comparison()?;
        while self.consume("&&") {
            let right = self.parse_comparison()?;
            left = Expr::Logical { op: '&', left: Box::new(left), right: Box::new(right), loc: loc.clone(), tag: None };
        }
        Ok(left)
    }

    /// `<=`→`l`, `>=`→`g`, `==`→`=`, `!=`→`!`; `<`/`>` keep their literal
    /// character. Non-associative: at most one comparison per expression,
    /// same as the character-stream grammar this follows.
    fn parse_comparison(&mut self) -> Result<Expr, BreadError> {
        let loc = self.loc();
        let left = self.parse_term()?;
        let op = if self.consume("==") {
            Some('=')
        } else if self.consume("!=") {
            Some('!')
        } else if self.consume("<=") {
            Some('l')
        } else if self.consume(">=") {
            Some('g')
        } else if self.consume("<") {
            Some('<')
        } else if self.consume(">") {
            Some('>')
        } else {
            None
        };
        match op {
            Some(op) => {
                let right = self.parse_term()?;
                Ok(Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc, tag: None })
            }
            None => Ok(left),
        }
    }

    fn parse_term(&mut self) -> Result<Expr, BreadError> {
        let loc = self.loc();
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.check("+") {
                '+'
            } else if self.check("-") {
                '-'
            } else {
                break;
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc: loc.clone(), tag: None };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, BreadError> {
        let loc = self.loc();
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.check("*") {
                '*'
            } else if self.check("/") {
                '/'
            } else if self.check("%") {
                '%'
            } else {
                break;
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), loc: loc.clone(), tag: None };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, BreadError> {
        let loc = self.loc();
        if self.consume("!") {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: '!', operand: Box::new(operand), loc, tag: None });
        }
        if self.consume("-") {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op: '-', operand: Box::new(operand), loc, tag: None });
        }
        let base = self.parse_primary()?;
        self.parse_postfix(base)
    }

    fn parse_postfix(&mut self, mut base: Expr) -> Result<Expr, BreadError> {
        loop {
            let loc = self.loc();
            if self.consume("[") {
                let index = self.parse_expression()?;
                self.expect("]")?;
                base = Expr::Index { target: Box::new(base), index: Box::new(index), loc, tag: None };
                continue;
            }
            let is_optional_chain = if self.consume("?.") {
                true
            } else if self.consume(".") {
                false
            } else {
                break;
            };
            // `?.(args)` — optional-chained direct call on the target.
            if is_optional_chain && self.check("(") {
                let args = self.parse_argument_list()?;
                base = match base {
                    Expr::Var { name, .. } => Expr::Call { callee: name, args, loc, tag: None },
                    other => Expr::MethodCall {
                        target: Box::new(other),
                        name: "call".to_string(),
                        args,
                        is_optional_chain: true,
                        loc,
                        tag: None,
                    },
                };
                continue;
            }
            let name = self.expect_ident("member name")?;
            if self.check("(") {
                let args = self.parse_argument_list()?;
                base = Expr::MethodCall {
                    target: Box::new(base),
                    name,
                    args,
                    is_optional_chain,
                    loc,
                    tag: None,
                };
            } else {
                base = Expr::Member { target: Box::new(base), name, is_optional_chain, loc, tag: None };
            }
        }
        Ok(base)
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, BreadError> {
        self.expect("(")?;
        let mut args = Vec::new();
        while !self.check(")") {
            args.push(self.parse_expression()?);
            if !self.consume(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, BreadError> {
        let loc = self.loc();
        if self.consume("nil") {
            return Ok(Expr::Literal { value: Literal::Nil, loc, tag: None });
        }
        if self.consume("true") {
            return Ok(Expr::Literal { value: Literal::Bool(true), loc, tag: None });
        }
        if self.consume("false") {
            return Ok(Expr::Literal { value: Literal::Bool(false), loc, tag: None });
        }
        if self.consume("self") {
            return Ok(Expr::SelfExpr { loc, tag: None });
        }
        if self.consume("super") {
            return Ok(Expr::SuperExpr { loc, tag: None });
        }
        if self.consume("(") {
            let inner = self.parse_expression()?;
            self.expect(")")?;
            return Ok(inner);
        }
        if self.check("[") {
            return self.parse_array_or_dict(loc);
        }
        if self.current_starts_with('"') {
            let text = self.parse_string_text("string literal")?;
            return Ok(Expr::Literal { value: Literal::String(text), loc, tag: None });
        }
        if self.current_is_number() {
            return self.parse_number(loc);
        }
        if self.current_is_ident_start() {
            let name = self.advance_text();
            // A block only ever follows a keyword (if/while/for/def/...),
            // all handled above, so `ident {` in expression position is
            // unambiguously a struct or class literal.
            if self.check("{") {
                return self.parse_struct_literal(name, loc);
            }
            if self.check("(") {
                let args = self.parse_argument_list()?;
                return Ok(Expr::Call { callee: name, args, loc, tag: None });
            }
            return Ok(Expr::Var { name, loc, tag: None });
        }
        Err(self.error_here(
            ErrorCategory::SyntaxError,
            &format!("unexpected token '{}'", self.current()),
        ))
    }

    fn parse_number(&mut self, loc: SourceLocation) -> Result<Expr, BreadError> {
        let text = self.advance_text();
        if text.contains('.') {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error_at(&loc, ErrorCategory::SyntaxError, &format!("invalid number '{text}'")))?;
            Ok(Expr::Literal { value: Literal::Double(value), loc, tag: None })
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error_at(&loc, ErrorCategory::SyntaxError, &format!("invalid number '{text}'")))?;
            Ok(Expr::Literal { value: Literal::Int(value), loc, tag: None })
        }
    }

    fn parse_array_or_dict(&mut self, loc: SourceLocation) -> Result<Expr, BreadError> {
        self.expect("[")?;
        // `[:]` — empty dict literal.
        if self.check(":") && self.peek_at(1) == Some("]") {
            self.advance();
            self.advance();
            return Ok(Expr::DictLiteral { entries: Vec::new(), loc, tag: None });
        }
        if self.consume("]") {
            return Ok(Expr::ArrayLiteral { elements: Vec::new(), loc, tag: None });
        }
        let first = self.parse_expression()?;
        if self.consume(":") {
            let mut entries = Vec::new();
            let first_value = self.parse_expression()?;
            entries.push((first, first_value));
            while self.consume(",") {
                let key = self.parse_expression()?;
                self.expect(":")?;
                let value = self.parse_expression()?;
                entries.push((key, value));
            }
            self.expect("]")?;
            return Ok(Expr::DictLiteral { entries, loc, tag: None });
        }
        let mut elements = vec![first];
        while self.consume(",") {
            elements.push(self.parse_expression()?);
        }
        self.expect("]")?;
        Ok(Expr::ArrayLiteral { elements, loc, tag: None })
    }

    fn parse_struct_literal(&mut self, type_name: String, loc: SourceLocation) -> Result<Expr, BreadError> {
        self.expect("{")?;
        let mut fields = Vec::new();
        while !self.check("}") {
            let name = self.expect_ident("field name")?;
            self.expect(":")?;
            let value = self.parse_expression()?;
            fields.push(FieldInit { name, value });
            if !self.consume(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(Expr::StructLiteral { type_name, fields, loc, tag: None })
    }

    fn parse_type_annotation(&mut self) -> Result<TypeDescriptor, BreadError> {
        let mut desc = if self.consume("[") {
            if self.consume(":") {
                let key = TypeDescriptor::Nil;
                self.expect("]")?;
                // `[:T]` is not otherwise valid; an explicit key/value pair
                // collapsing straight to `]` means an empty-dict annotation.
                TypeDescriptor::create_dict(key, TypeDescriptor::Nil)
            } else {
                let first = self.parse_type_annotation()?;
                if self.consume(":") {
                    let value = self.parse_type_annotation()?;
                    self.expect("]")?;
                    TypeDescriptor::create_dict(first, value)
                } else {
                    self.expect("]")?;
                    TypeDescriptor::create_array(first)
                }
            }
        } else {
            let name = self.expect_ident("type name")?;
            TypeDescriptor::create_primitive(&name).unwrap_or_else(|| TypeDescriptor::create_struct(name, Vec::new()))
        };
        while self.consume("?") {
            desc = TypeDescriptor::create_optional(desc);
        }
        Ok(desc)
    }

    // ---- token-buffer plumbing -----------------------------------------

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current(&self) -> &str {
        if self.is_at_end() {
            ""
        } else {
            &self.tokens[self.pos].text
        }
    }

    fn current_starts_with(&self, c: char) -> bool {
        self.current().starts_with(c)
    }

    fn current_is_number(&self) -> bool {
        self.current().chars().next().is_some_and(|c| c.is_ascii_digit())
    }

    fn current_is_ident_start(&self) -> bool {
        self.current().chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
    }

    fn check(&self, expected: &str) -> bool {
        !self.is_at_end() && self.tokens[self.pos].text == expected
    }

    fn peek_at(&self, n: usize) -> Option<&str> {
        self.tokens.get(self.pos + n).map(|t| t.text.as_str())
    }

    fn consume(&mut self, expected: &str) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn advance_text(&mut self) -> String {
        let text = self.current().to_string();
        self.advance();
        text
    }

    fn expect(&mut self, expected: &str) -> Result<(), BreadError> {
        if self.consume(expected) {
            Ok(())
        } else {
            Err(self.error_here(
                ErrorCategory::SyntaxError,
                &format!("expected '{expected}', found '{}'", self.current()),
            ))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, BreadError> {
        if self.current_is_ident_start() {
            Ok(self.advance_text())
        } else {
            Err(self.error_here(ErrorCategory::SyntaxError, &format!("expected {what}, found '{}'", self.current())))
        }
    }

    fn parse_string_text(&mut self, what: &str) -> Result<String, BreadError> {
        if !self.current_starts_with('"') {
            return Err(self.error_here(ErrorCategory::SyntaxError, &format!("expected {what}")));
        }
        let raw = self.advance_text();
        unescape_string(&raw[1..raw.len() - 1])
            .map_err(|msg| self.error_here(ErrorCategory::SyntaxError, &msg))
    }

    fn loc(&self) -> SourceLocation {
        if self.is_at_end() {
            let last = self.tokens.last();
            SourceLocation::new(
                self.file.clone(),
                last.map(|t| t.line + 1).unwrap_or(1),
                last.map(|t| t.column + 1).unwrap_or(1),
            )
        } else {
            let t = &self.tokens[self.pos];
            SourceLocation::new(self.file.clone(), t.line + 1, t.column + 1)
        }
    }

    fn error_here(&self, category: ErrorCategory, message: &str) -> BreadError {
        let loc = self.loc();
        self.error_at(&loc, category, message)
    }

    fn error_at(&self, loc: &SourceLocation, category: ErrorCategory, message: &str) -> BreadError {
        BreadError::new(category, message).at((*loc.file).clone(), loc.line, loc.column)
    }
}

fn expr_to_assign_target(expr: Expr, parser: &Parser) -> Result<AssignTarget, BreadError> {
    match expr {
        Expr::Var { name, .. } => Ok(AssignTarget::Var(name)),
        Expr::Index { target, index, .. } => Ok(AssignTarget::Index { target: *target, index: *index }),
        Expr::Member { target, name, .. } => Ok(AssignTarget::Member { target: *target, name }),
        other => Err(parser.error_at(other.loc(), ErrorCategory::SyntaxError, "invalid assignment target")),
    }
}

fn unescape_string(s: &str) -> Result<String, String> {
    let mut result = String::new();
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some(c) => return Err(format!("unknown escape sequence '\\{c}' in string literal")),
            None => return Err("string ends with an incomplete escape sequence".to_string()),
        }
    }
    Ok(result)
}

/// Splits source text into a flat token buffer: identifiers/keywords,
/// integer/float literals, quoted strings (escapes resolved later by
/// `unescape_string`, quotes kept so the parser can tell a string token
/// from a bare identifier), and punctuation — multi-character operators
/// (`==`, `!=`, `<=`, `>=`, `&&`, `||`, `->`, `?.`, and the compound
/// assignment operators) are merged into single tokens so the parser never
/// has to look past one token of lookahead.
fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 0usize;
    let mut col = 0usize;

    let two_char_ops = ["==", "!=", "<=", ">=", "&&", "||", "->", "?."];

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            i += 1;
            line += 1;
            col = 0;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            col += 1;
            continue;
        }
        if c == '"' {
            let (start_line, start_col) = (line, col);
            let start = i;
            i += 1;
            col += 1;
            let mut escaped = false;
            while i < chars.len() && (chars[i] != '"' || escaped) {
                escaped = chars[i] == '\\' && !escaped;
                if chars[i] == '\n' {
                    line += 1;
                    col = 0;
                } else {
                    col += 1;
                }
                i += 1;
            }
            if i < chars.len() {
                i += 1;
                col += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token { text, line: start_line, column: start_col });
            continue;
        }
        if c.is_ascii_digit() {
            let (start_line, start_col) = (line, col);
            let start = i;
            let mut seen_dot = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '.' && !seen_dot)) {
                if chars[i] == '.' {
                    seen_dot = true;
                }
                i += 1;
                col += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token { text, line: start_line, column: start_col });
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let (start_line, start_col) = (line, col);
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
                col += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token { text, line: start_line, column: start_col });
            continue;
        }
        if c == '+' || c == '-' || c == '*' || c == '/' || c == '%' {
            if i + 1 < chars.len() && chars[i + 1] == '=' {
                let text: String = chars[i..i + 2].iter().collect();
                tokens.push(Token { text, line, column: col });
                i += 2;
                col += 2;
                continue;
            }
        }
        if i + 1 < chars.len() {
            let pair: String = chars[i..i + 2].iter().collect();
            if two_char_ops.contains(&pair.as_str()) {
                tokens.push(Token { text: pair, line, column: col });
                i += 2;
                col += 2;
                continue;
            }
        }
        tokens.push(Token { text: c.to_string(), line, column: col });
        i += 1;
        col += 1;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use bread_core::types::TypeDescriptor;

    fn parse(src: &str) -> Program {
        Parser::new(src, "<test>").parse_program().expect("parse failed")
    }

    #[test]
    fn parses_var_decl_with_explicit_type() {
        let program = parse("let x: Int = 5\n");
        match &program.statements[0] {
            Stmt::VarDecl { name, declared_type, kind, .. } => {
                assert_eq!(name, "x");
                assert_eq!(declared_type.as_ref().unwrap(), &TypeDescriptor::Int);
                assert_eq!(*kind, VarKind::Let);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_var_decl_without_type_annotation() {
        let program = parse("var y = 10\n");
        match &program.statements[0] {
            Stmt::VarDecl { declared_type, .. } => assert!(declared_type.is_none()),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_binary_precedence() {
        let program = parse("let x = 1 + 2 * 3\n");
        match &program.statements[0] {
            Stmt::VarDecl { init, .. } => match init {
                Expr::Binary { op: '+', right, .. } => {
                    assert!(matches!(**right, Expr::Binary { op: '*', .. }));
                }
                other => panic!("unexpected expr: {other:?}"),
            },
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn encodes_comparison_operators() {
        let le = parse("let a = 1 <= 2\n");
        let ge = parse("let a = 1 >= 2\n");
        let eq = parse("let a = 1 == 2\n");
        let ne = parse("let a = 1 != 2\n");
        for (prog, expected) in [(le, 'l'), (ge, 'g'), (eq, '='), (ne, '!')] {
            match &prog.statements[0] {
                Stmt::VarDecl { init: Expr::Binary { op, .. }, .. } => assert_eq!(*op, expected),
                other => panic!("unexpected statement: {other:?}"),
            }
        }
    }

    #[test]
    fn parses_index_and_member_postfix_chain() {
        let program = parse("let a = arr[0].name\n");
        match &program.statements[0] {
            Stmt::VarDecl { init: Expr::Member { target, name, .. }, .. } => {
                assert_eq!(name, "name");
                assert!(matches!(**target, Expr::Index { .. }));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_optional_chain_method_call() {
        let program = parse("let a = x?.foo()\n");
        match &program.statements[0] {
            Stmt::VarDecl { init: Expr::MethodCall { is_optional_chain, .. }, .. } => {
                assert!(*is_optional_chain);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_empty_dict_literal() {
        let program = parse("let d = [:]\n");
        match &program.statements[0] {
            Stmt::VarDecl { init: Expr::DictLiteral { entries, .. }, .. } => assert!(entries.is_empty()),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_array_literal() {
        let program = parse("let a = [1, 2, 3]\n");
        match &program.statements[0] {
            Stmt::VarDecl { init: Expr::ArrayLiteral { elements, .. }, .. } => assert_eq!(elements.len(), 3),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_index_assignment() {
        let program = parse("arr[0] = 5\n");
        match &program.statements[0] {
            Stmt::Assign { target: AssignTarget::Index { .. }, compound_op: None, .. } => {}
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_compound_assignment() {
        let program = parse("x += 1\n");
        match &program.statements[0] {
            Stmt::Assign { target: AssignTarget::Var(name), compound_op: Some('+'), .. } => {
                assert_eq!(name, "x");
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_bare_method_call_as_expr_stmt() {
        let program = parse("arr.append(1)\n");
        assert!(matches!(&program.statements[0], Stmt::ExprStmt { expr: Expr::MethodCall { .. }, .. }));
    }

    #[test]
    fn parses_function_decl_with_default_param() {
        let program = parse("def add(a: Int, b: Int = 1) -> Int { return a + b }\n");
        match &program.statements[0] {
            Stmt::FuncDecl(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.required_param_count(), 1);
                assert_eq!(f.return_type.as_ref().unwrap(), &TypeDescriptor::Int);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_default_param_after_default_param() {
        let err = Parser::new("def f(a: Int = 1, b: Int) { return a }\n", "<test>").parse_program();
        assert!(err.is_err());
    }

    #[test]
    fn parses_class_with_extends_and_init() {
        let src = r#"
            class Animal {
                name: String
                init(n: String) { self.name = n }
                def speak() -> String { return "..." }
            }
            class Dog extends Animal {
                init(n: String) { super.init(n) }
                def speak() -> String { return "woof" }
            }
        "#;
        let program = parse(src);
        match &program.statements[1] {
            Stmt::ClassDecl(c) => {
                assert_eq!(c.name, "Dog");
                assert_eq!(c.parent_name.as_deref(), Some("Animal"));
                assert_eq!(c.methods.len(), 1);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn class_without_init_is_rejected() {
        let result = Parser::new("class Foo { x: Int }\n", "<test>").parse_program();
        assert!(result.is_err());
    }

    #[test]
    fn parses_struct_literal() {
        let program = parse(r#"let p = Point{x: 1, y: 2}"#);
        match &program.statements[0] {
            Stmt::VarDecl { init: Expr::StructLiteral { type_name, fields, .. }, .. } => {
                assert_eq!(type_name, "Point");
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_if_else_if_chain() {
        let src = "if x > 0 { return 1 } else if x < 0 { return -1 } else { return 0 }\n";
        let program = parse(src);
        assert!(matches!(&program.statements[0], Stmt::If { else_branch: Some(_), .. }));
    }

    #[test]
    fn parses_for_loop_over_range_call() {
        let program = parse("for i in range(10) { print(i) }\n");
        match &program.statements[0] {
            Stmt::For { var_name, iter, body, .. } => {
                assert_eq!(var_name, "i");
                assert!(matches!(iter, Expr::Call { callee, .. } if callee == "range"));
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_string_literal_with_escapes() {
        let program = parse(r#"let s = "line\nbreak""#);
        match &program.statements[0] {
            Stmt::VarDecl { init: Expr::Literal { value: Literal::String(s), .. }, .. } => {
                assert_eq!(s, "line\nbreak");
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_nested_array_type_annotation() {
        let program = parse("let a: [[Int]] = []\n");
        match &program.statements[0] {
            Stmt::VarDecl { declared_type: Some(TypeDescriptor::Array(inner)), .. } => {
                assert!(matches!(**inner, TypeDescriptor::Array(_)));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn parses_import_with_alias() {
        let program = parse(r#"import "math" as m"#);
        match &program.statements[0] {
            Stmt::Import { path, alias, .. } => {
                assert_eq!(path, "math");
                assert_eq!(alias.as_deref(), Some("m"));
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }
}
