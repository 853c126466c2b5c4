use crate::ast::{
    BinaryOp, ClassDecl, Expr, ExprKind, FuncDecl, LiteralValue, LogicalOp, NodeId, Param, Stmt,
    StmtKind, TypeAnnotation, UnaryOp,
};
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::token::{Literal, Token, TokenKind};
use std::rc::Rc;

/// Marker for panic-mode unwinding. The diagnostic is already recorded by
/// the time this is constructed.
struct ParseError;

type PResult<T> = Result<T, ParseError>;

pub fn parse(tokens: Vec<Token>, diags: &mut Diagnostics) -> Vec<Stmt> {
    Parser::new(tokens, diags).parse()
}

pub struct Parser<'a> {
    diags: &'a mut Diagnostics,
    tokens: Vec<Token>,
    current: usize,
    next_id: NodeId,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, diags: &'a mut Diagnostics) -> Self {
        Self {
            diags,
            tokens,
            current: 0,
            next_id: 0,
        }
    }

    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    /// Top-level grammar: variable definitions, functions, classes, plain
    /// statements. On error, synchronizes to the next statement boundary
    /// and keeps going.
    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.check_two(TokenKind::Identifier, TokenKind::Colon) {
            self.var_definition("global variable")
        } else if self.matches(&[TokenKind::Def]) {
            self.function("function")
        } else if self.matches(&[TokenKind::Class]) {
            self.class_definition()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    /// Statements permitted directly inside a function body. Unlike nested
    /// blocks these admit local variable definitions, nested functions and
    /// scope declarations.
    fn function_statement(&mut self) -> Option<Stmt> {
        let result = if self.matches(&[TokenKind::Global]) {
            self.global_declaration()
        } else if self.matches(&[TokenKind::Nonlocal]) {
            self.nonlocal_declaration()
        } else if self.check_two(TokenKind::Identifier, TokenKind::Colon) {
            self.var_definition("function local variable")
        } else if self.matches(&[TokenKind::Def]) {
            self.function("inner function")
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn statement(&mut self) -> PResult<Stmt> {
        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }

        let stmt = self.simple_statement()?;
        if !self.is_at_end() {
            self.consume(TokenKind::Newline, "Expect 'newline' after simple statement")?;
        }
        Ok(stmt)
    }

    fn simple_statement(&mut self) -> PResult<Stmt> {
        if self.matches(&[TokenKind::Pass]) {
            let line = self.previous().line;
            return Ok(self.stmt(line, StmtKind::Pass));
        }
        if self.matches(&[TokenKind::Return]) {
            return self.return_statement();
        }
        self.expression_statement()
    }

    /// An expression statement, or an assignment once one or more `=` show
    /// up: `a = b.x = c[0] = value` keeps the targets in source order on a
    /// single node, with the rightmost expression as the value.
    fn expression_statement(&mut self) -> PResult<Stmt> {
        let first = self.expression()?;
        let line = first.line;

        if !self.check(TokenKind::Equal) {
            return Ok(self.stmt(line, StmtKind::Expression(first)));
        }

        let mut targets = Vec::new();
        let mut last = first;
        while self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            if matches!(
                last.kind,
                ExprKind::Identifier(_) | ExprKind::Attribute { .. } | ExprKind::Index { .. }
            ) {
                targets.push(last);
            } else {
                // Report and keep parsing; the value expression may hold
                // more errors worth surfacing.
                self.error(&equals, "Invalid assignment target");
            }
            last = self.expression()?;
        }

        Ok(self.stmt(line, StmtKind::Assign { targets, value: last }))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let line = self.previous().line;
        let value = if self.check(TokenKind::Newline) {
            None
        } else {
            Some(self.expression()?)
        };
        Ok(self.stmt(line, StmtKind::Return { value }))
    }

    fn global_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name")?;
        let (name, line) = (name.lexeme.clone(), name.line);
        self.consume(
            TokenKind::Newline,
            "Expect 'newline' after global variable declaration",
        )?;
        Ok(self.stmt(line, StmtKind::Global { name }))
    }

    fn nonlocal_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name")?;
        let (name, line) = (name.lexeme.clone(), name.line);
        self.consume(
            TokenKind::Newline,
            "Expect 'newline' after nonlocal variable declaration",
        )?;
        Ok(self.stmt(line, StmtKind::Nonlocal { name }))
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        let line = self.previous().line;
        let condition = self.expression()?;
        self.consume(TokenKind::Colon, "Expect ':' after if condition")?;
        let then_branch = self.block()?;

        let mut else_branch = Vec::new();
        if self.matches(&[TokenKind::Elif]) {
            else_branch.push(self.if_statement()?);
        } else if self.matches(&[TokenKind::Else]) {
            self.consume(TokenKind::Colon, "Expect ':' after else keyword")?;
            else_branch = self.block()?;
        }

        Ok(self.stmt(
            line,
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
        ))
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        let line = self.previous().line;
        let condition = self.expression()?;
        self.consume(TokenKind::Colon, "Expect ':' after condition")?;
        let body = self.block()?;
        Ok(self.stmt(line, StmtKind::While { condition, body }))
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        let identifier = self.consume(TokenKind::Identifier, "Expect element name")?;
        let (variable, variable_line) = (identifier.lexeme.clone(), identifier.line);
        self.consume(TokenKind::In, "Expect 'in' after loop variable")?;
        let iterable = self.expression()?;
        self.consume(TokenKind::Colon, "Expect ':' after iterable")?;
        let body = self.block()?;
        Ok(self.stmt(
            variable_line,
            StmtKind::For {
                variable,
                variable_line,
                iterable,
                body,
            },
        ))
    }

    /// NEWLINE INDENT statement+ DEDENT. Nested blocks carry statements
    /// only; definitions live at function, class or program level.
    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.consume(TokenKind::Newline, "Expect 'newline' before block")?;
        self.consume(TokenKind::Indent, "Expect 'indent' before block")?;

        let mut statements = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume(TokenKind::Dedent, "Expect 'dedent' after block")?;
        Ok(statements)
    }

    fn var_definition(&mut self, kind: &str) -> PResult<Stmt> {
        let (name, line, annotation) = self.typed_var_declaration(kind)?;
        self.consume(TokenKind::Equal, &format!("Expect '=' after {kind} declaration"))?;
        let init = self.literal()?;
        if !self.is_at_end() {
            self.consume(
                TokenKind::Newline,
                &format!("Expect 'newline' after {kind} definition"),
            )?;
        }
        Ok(self.stmt(line, StmtKind::VarDecl { name, annotation, init }))
    }

    fn typed_var_declaration(&mut self, kind: &str) -> PResult<(String, usize, TypeAnnotation)> {
        if self.check(TokenKind::Identifier) || self.check(TokenKind::SelfKw) {
            let name = self.advance().clone();
            self.consume(TokenKind::Colon, &format!("Expect ':' after {kind} name"))?;
            let annotation = self.var_type(kind)?;
            return Ok((name.lexeme, name.line, annotation));
        }
        Err(self.error_at_current(&format!("Unexpected token for {kind} identifier")))
    }

    fn var_type(&mut self, kind: &str) -> PResult<TypeAnnotation> {
        if self.check(TokenKind::Identifier)
            || self.check(TokenKind::Bool)
            || self.check(TokenKind::Str)
            || self.check(TokenKind::Int)
            || self.check(TokenKind::Object)
            || self.check(TokenKind::IdString)
        {
            let token = self.advance().clone();
            let name = match &token.literal {
                // A quoted class name: use the decoded identifier.
                Some(Literal::Str(value)) => value.clone(),
                _ => token.lexeme.clone(),
            };
            return Ok(TypeAnnotation::Name(name));
        }
        if self.matches(&[TokenKind::LeftBracket]) {
            let element = self.var_type(kind)?;
            self.consume(
                TokenKind::RightBracket,
                &format!("Expect ']' after {kind} type name"),
            )?;
            return Ok(TypeAnnotation::ListOf(Box::new(element)));
        }
        Err(self.error_at_current(&format!("Unexpected token for {kind} type")))
    }

    fn function(&mut self, kind: &str) -> PResult<Stmt> {
        // Function names may shadow the native functions.
        let name = if self.check(TokenKind::Identifier)
            || self.check(TokenKind::Input)
            || self.check(TokenKind::Len)
            || self.check(TokenKind::Print)
        {
            self.advance().clone()
        } else {
            return Err(self.error_at_current(&format!("Expect {kind} name")));
        };

        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name"))?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 parameters");
                }
                let (pname, pline, annotation) = self.typed_var_declaration("function parameter")?;
                params.push(Param {
                    name: pname,
                    line: pline,
                    annotation,
                });
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters")?;

        let return_annotation = if self.check(TokenKind::Colon) {
            TypeAnnotation::Name("<None>".to_string())
        } else {
            self.consume(TokenKind::Arrow, &format!("Expect '->' before {kind} return type"))?;
            self.var_type("return")?
        };

        self.consume(TokenKind::Colon, &format!("Expect ':' after {kind} definition"))?;
        self.consume(TokenKind::Newline, &format!("Expect 'newline' after {kind} definition"))?;
        self.consume(TokenKind::Indent, &format!("Expect 'indent' before {kind} body"))?;

        let mut body = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            if let Some(stmt) = self.function_statement() {
                body.push(stmt);
            }
        }
        self.consume(TokenKind::Dedent, &format!("Expect 'dedent' after {kind} body"))?;

        let id = self.id();
        Ok(self.stmt(
            name.line,
            StmtKind::Func(Rc::new(FuncDecl {
                id,
                line: name.line,
                name: name.lexeme,
                params,
                return_annotation,
                body,
            })),
        ))
    }

    fn class_definition(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect class name")?.clone();
        self.consume(TokenKind::LeftParen, "Expect '(' after class name")?;

        let superclass = if self.check(TokenKind::Identifier) || self.check(TokenKind::Object) {
            self.advance().clone()
        } else {
            return Err(self.error_at_current("Expect superclass name"));
        };

        self.consume(TokenKind::RightParen, "Expect ')' after superclass name")?;
        self.consume(TokenKind::Colon, "Expect ':' after class declaration")?;
        self.consume(TokenKind::Newline, "Expect 'newline' after class declaration")?;
        self.consume(TokenKind::Indent, "Expect 'indent' before class body")?;

        let mut body = Vec::new();
        while !self.check(TokenKind::Dedent) && !self.is_at_end() {
            body.push(self.class_member()?);
        }
        self.consume(TokenKind::Dedent, "Expect 'dedent' after class body")?;

        let id = self.id();
        Ok(self.stmt(
            name.line,
            StmtKind::Class(Rc::new(ClassDecl {
                id,
                line: name.line,
                name: name.lexeme,
                superclass: superclass.lexeme,
                superclass_line: superclass.line,
                body,
            })),
        ))
    }

    fn class_member(&mut self) -> PResult<Stmt> {
        if self.matches(&[TokenKind::Pass]) {
            let line = self.previous().line;
            if !self.is_at_end() {
                self.consume(TokenKind::Newline, "Expect 'newline' after pass statement")?;
            }
            return Ok(self.stmt(line, StmtKind::Pass));
        }
        if self.check(TokenKind::Identifier) {
            return self.var_definition("class field");
        }
        if self.matches(&[TokenKind::Def]) {
            return self.function("method");
        }
        Err(self.error_at_current("Unexpected token in class body"))
    }

    // Expressions. Assignment is handled at statement level; everything
    // below starts at the ternary.

    fn expression(&mut self) -> PResult<Expr> {
        self.ternary()
    }

    fn ternary(&mut self) -> PResult<Expr> {
        let then = self.or()?;

        if self.matches(&[TokenKind::If]) {
            let line = self.previous().line;
            let condition = self.or()?;
            self.consume(TokenKind::Else, "Expected 'else' after condition expression")?;
            let otherwise = self.ternary()?;
            return Ok(self.expr(
                line,
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                },
            ));
        }

        Ok(then)
    }

    fn or(&mut self) -> PResult<Expr> {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::Or]) {
            let line = self.previous().line;
            let right = self.and()?;
            expr = self.expr(
                line,
                ExprKind::Logical {
                    left: Box::new(expr),
                    op: LogicalOp::Or,
                    right: Box::new(right),
                },
            );
        }
        Ok(expr)
    }

    fn and(&mut self) -> PResult<Expr> {
        let mut expr = self.not()?;
        while self.matches(&[TokenKind::And]) {
            let line = self.previous().line;
            let right = self.not()?;
            expr = self.expr(
                line,
                ExprKind::Logical {
                    left: Box::new(expr),
                    op: LogicalOp::And,
                    right: Box::new(right),
                },
            );
        }
        Ok(expr)
    }

    fn not(&mut self) -> PResult<Expr> {
        if self.matches(&[TokenKind::Not]) {
            let line = self.previous().line;
            let operand = self.equality()?;
            return Ok(self.expr(
                line,
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            ));
        }
        self.equality()
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::Ne,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                TokenKind::Is => BinaryOp::Is,
                _ => break,
            };
            let line = self.advance().line;
            let right = self.term()?;
            expr = self.expr(
                line,
                ExprKind::Binary {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let line = self.advance().line;
            let right = self.factor()?;
            expr = self.expr(
                line,
                ExprKind::Binary {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::DoubleSlash => BinaryOp::Div,
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let line = self.advance().line;
            let right = self.unary()?;
            expr = self.expr(
                line,
                ExprKind::Binary {
                    left: Box::new(expr),
                    op,
                    right: Box::new(right),
                },
            );
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.matches(&[TokenKind::Minus]) {
            let line = self.previous().line;
            let operand = self.unary()?;
            return Ok(self.expr(
                line,
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
            ));
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                let line = self.previous().line;
                let args = self.arguments()?;
                expr = self.expr(
                    line,
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                );
            } else if self.matches(&[TokenKind::Dot]) {
                let name = self
                    .consume(TokenKind::Identifier, "Expect property name after '.'")?
                    .clone();
                expr = self.expr(
                    name.line,
                    ExprKind::Attribute {
                        object: Box::new(expr),
                        name: name.lexeme,
                    },
                );
            } else if self.matches(&[TokenKind::LeftBracket]) {
                let index = self.expression()?;
                let close = self.consume(TokenKind::RightBracket, "Expect ']' after list index")?;
                let line = close.line;
                expr = self.expr(
                    line,
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    },
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= 255 {
                    let token = self.peek().clone();
                    self.error(&token, "Can't have more than 255 arguments");
                }
                args.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments")?;
        Ok(args)
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.matches(&[TokenKind::None]) {
            let line = self.previous().line;
            return Ok(self.expr(line, ExprKind::Literal(LiteralValue::None)));
        }
        if self.matches(&[TokenKind::True]) {
            let line = self.previous().line;
            return Ok(self.expr(line, ExprKind::Literal(LiteralValue::Bool(true))));
        }
        if self.matches(&[TokenKind::False]) {
            let line = self.previous().line;
            return Ok(self.expr(line, ExprKind::Literal(LiteralValue::Bool(false))));
        }
        if self.matches(&[TokenKind::Number, TokenKind::String, TokenKind::IdString]) {
            let token = self.previous().clone();
            let value = match token.literal {
                Some(Literal::Int(n)) => LiteralValue::Int(n),
                Some(Literal::Str(s)) => LiteralValue::Str(s),
                _ => LiteralValue::Int(0),
            };
            return Ok(self.expr(token.line, ExprKind::Literal(value)));
        }
        if self.matches(&[TokenKind::SelfKw]) {
            let line = self.previous().line;
            return Ok(self.expr(line, ExprKind::SelfRef));
        }
        if self.matches(&[
            TokenKind::Identifier,
            TokenKind::Object,
            TokenKind::Int,
            TokenKind::Str,
            TokenKind::Bool,
        ]) {
            let token = self.previous().clone();
            return Ok(self.expr(token.line, ExprKind::Identifier(token.lexeme)));
        }
        if self.matches(&[TokenKind::Len]) {
            let line = self.previous().line;
            self.consume(TokenKind::LeftParen, "Expect '(' before argument")?;
            let value = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after argument")?;
            return Ok(self.expr(line, ExprKind::Len(Box::new(value))));
        }
        if self.matches(&[TokenKind::Input]) {
            let line = self.previous().line;
            self.consume(TokenKind::LeftParen, "Expect '(' for function call")?;
            self.consume(TokenKind::RightParen, "Expect ')' for function call")?;
            return Ok(self.expr(line, ExprKind::Input));
        }
        if self.matches(&[TokenKind::Print]) {
            let line = self.previous().line;
            self.consume(TokenKind::LeftParen, "Expect '(' before argument")?;
            let value = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after argument")?;
            return Ok(self.expr(line, ExprKind::Print(Box::new(value))));
        }
        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression")?;
            return Ok(expr);
        }
        if self.matches(&[TokenKind::LeftBracket]) {
            let line = self.previous().line;
            let mut elements = Vec::new();
            if !self.check(TokenKind::RightBracket) {
                loop {
                    if elements.len() >= 255 {
                        let token = self.peek().clone();
                        self.error(&token, "Can't have more than 255 elements");
                    }
                    elements.push(self.expression()?);
                    if !self.matches(&[TokenKind::Comma]) {
                        break;
                    }
                }
            }
            self.consume(TokenKind::RightBracket, "Expect ']' after list definition")?;
            return Ok(self.expr(line, ExprKind::ListLiteral(elements)));
        }

        Err(self.error_at_current("Expect expression"))
    }

    /// Variable definitions take a literal initializer only. List literals
    /// are allowed as long as their elements are themselves literals.
    fn literal(&mut self) -> PResult<Expr> {
        if self.check(TokenKind::None)
            || self.check(TokenKind::True)
            || self.check(TokenKind::False)
            || self.check(TokenKind::Number)
            || self.check(TokenKind::String)
            || self.check(TokenKind::IdString)
        {
            return self.primary();
        }
        if self.matches(&[TokenKind::LeftBracket]) {
            let line = self.previous().line;
            let mut elements = Vec::new();
            if !self.check(TokenKind::RightBracket) {
                loop {
                    if elements.len() >= 255 {
                        let token = self.peek().clone();
                        self.error(&token, "Can't have more than 255 elements");
                    }
                    elements.push(self.literal()?);
                    if !self.matches(&[TokenKind::Comma]) {
                        break;
                    }
                }
            }
            self.consume(TokenKind::RightBracket, "Expect ']' after list definition")?;
            return Ok(self.expr(line, ExprKind::ListLiteral(elements)));
        }
        Err(self.error_at_current("Expected literal for var definition"))
    }

    // Token plumbing.

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn check_two(&self, first: TokenKind, second: TokenKind) -> bool {
        self.check(first) && self.peek_next().kind == second
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_at_current(message))
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> &Token {
        if self.is_at_end() {
            return self.peek();
        }
        &self.tokens[self.current + 1]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn error_at_current(&mut self, message: &str) -> ParseError {
        let token = self.peek().clone();
        self.error(&token, message)
    }

    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        self.diags
            .error(token.line, ErrorKind::Syntax, format!("{message} at {token}"));
        ParseError
    }

    /// Skips to the next statement boundary after a parse error.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Newline {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Def
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn expr(&mut self, line: usize, kind: ExprKind) -> Expr {
        Expr {
            id: self.id(),
            line,
            kind,
        }
    }

    fn stmt(&mut self, line: usize, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.id(),
            line,
            kind,
        }
    }
}
