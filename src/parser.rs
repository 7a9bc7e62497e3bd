use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::lexeme::{Lexeme, Token};
use crate::span::{Span, Spanned};

/// Top-down recursive-descent parser with precedence climbing for binary
/// operators. Cursor is a single monotonic index into the token vector.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_file(&mut self) -> Result<File, Diagnostic> {
        let mut functions = Vec::new();
        while self.peek().kind != Lexeme::Eof {
            functions.push(self.parse_function()?);
        }
        Ok(functions)
    }

    fn parse_function(&mut self) -> Result<Function, Diagnostic> {
        self.expect(Lexeme::Fn, "Expected 'fn' keyword.")?;
        let proto = self.parse_prototype()?;
        self.expect(Lexeme::LBrace, "Expected '{' to start function body.")?;
        let body = self.parse_block()?;
        self.expect(Lexeme::RBrace, "Expected '}' to end function body.")?;
        Ok(Function { proto, body })
    }

    fn parse_prototype(&mut self) -> Result<Spanned<Prototype>, Diagnostic> {
        let tok = self.peek().clone();
        let name = match &tok.kind {
            Lexeme::Ident(name) => name.clone(),
            _ => return Err(self.error_here("Expected function name not available!")),
        };
        self.advance();
        self.expect(Lexeme::LParen, "Expected '(' after function name.")?;

        let mut params = Vec::new();
        while self.peek().kind != Lexeme::RParen {
            let param_tok = self.peek().clone();
            match &param_tok.kind {
                Lexeme::Ident(name) => params.push(name.clone()),
                _ => return Err(self.error_here("Expected identifier in function arguments.")),
            }
            self.advance();

            if self.peek().kind == Lexeme::Comma {
                self.advance();
            } else if self.peek().kind != Lexeme::RParen {
                return Err(self.error_here("Expected ',' or ')' in function arguments."));
            }
        }
        self.expect(Lexeme::RParen, "Expected ')' after function parameters.")?;

        Ok(Spanned::new(
            Prototype { name, params },
            Span::new(tok.line, tok.column),
        ))
    }

    fn parse_block(&mut self) -> Result<Block, Diagnostic> {
        let mut exprs = Vec::new();
        while self.peek().kind != Lexeme::RBrace && self.peek().kind != Lexeme::Eof {
            match self.peek().kind {
                Lexeme::Semicolon => {
                    self.advance();
                }
                Lexeme::If => exprs.push(self.parse_if()?),
                Lexeme::For => exprs.push(self.parse_for()?),
                _ => exprs.push(self.parse_expression()?),
            }
        }
        Ok(Block { exprs })
    }

    /// `expression := assignment | binary(0)`. An identifier immediately
    /// followed by `=` is an assignment; everything else is a binary
    /// expression. Assignment is therefore not nestable inside another
    /// expression — it is effectively a statement.
    fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        if let Lexeme::Ident(_) = self.peek().kind {
            if self.peek_at(1).map(|t| &t.kind) == Some(&Lexeme::Eq) {
                return self.parse_assignment();
            }
        }
        self.parse_binary_expr(0)
    }

    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let tok = self.peek().clone();
        let name = match &tok.kind {
            Lexeme::Ident(name) => name.clone(),
            _ => unreachable!("parse_assignment called without a leading identifier"),
        };
        self.advance(); // identifier
        self.expect(Lexeme::Eq, "Expected '=' after variable name.")?;
        let value = self.parse_expression()?;
        self.expect(Lexeme::Semicolon, "Expected ';' after assignment.")?;
        Ok(Expr::new(
            ExprKind::Assign {
                name,
                value: Box::new(value),
            },
            Span::new(tok.line, tok.column),
        ))
    }

    /// `binary(n) := primary (BINOP binary(prec(BINOP)+1))* while prec(BINOP) >= n`
    fn parse_binary_expr(&mut self, min_prec: u8) -> Result<Expr, Diagnostic> {
        let mut lhs = self.parse_primary()?;
        while let Some(op) = binop_from_lexeme(&self.peek().kind) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            let span = lhs.span;
            self.advance(); // operator
            let rhs = self.parse_binary_expr(prec + 1)?;
            lhs = Expr::new(
                ExprKind::BinaryOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let tok = self.peek().clone();
        match &tok.kind {
            Lexeme::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(*n), Span::new(tok.line, tok.column)))
            }
            Lexeme::String(s) => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::String(s.clone()),
                    Span::new(tok.line, tok.column),
                ))
            }
            Lexeme::Ident(name) => self.parse_identifier_or_call(name.clone(), &tok),
            Lexeme::Print => self.parse_print(),
            Lexeme::If => self.parse_if(),
            _ => Err(self.error_here(format!(
                "Unknown token at position: {} -> {}",
                self.pos, tok.lexeme
            ))),
        }
    }

    fn parse_identifier_or_call(&mut self, name: String, tok: &Token) -> Result<Expr, Diagnostic> {
        let span = Span::new(tok.line, tok.column);
        self.advance(); // identifier
        if self.peek().kind != Lexeme::LParen {
            return Ok(Expr::new(ExprKind::Variable(name), span));
        }

        self.advance(); // '('
        let mut args = Vec::new();
        while self.peek().kind != Lexeme::RParen {
            args.push(self.parse_expression()?);
            if self.peek().kind == Lexeme::Comma {
                self.advance();
            } else if self.peek().kind != Lexeme::RParen {
                return Err(self.error_here("Expected ',' or ')' in function call."));
            }
        }
        self.expect(Lexeme::RParen, "Expected ')' after call arguments.")?;

        Ok(Expr::new(ExprKind::Call { callee: name, args }, span))
    }

    fn parse_print(&mut self) -> Result<Expr, Diagnostic> {
        let tok = self.peek().clone();
        self.advance(); // 'print'
        self.expect(Lexeme::LParen, "Expected '(' after 'print'")?;
        let expr = self.parse_expression()?;
        self.expect(Lexeme::RParen, "Expected ')' after print expression.")?;
        Ok(Expr::new(
            ExprKind::Print(Box::new(expr)),
            Span::new(tok.line, tok.column),
        ))
    }

    /// `if-expr := 'if' expression '{' block '}' else-tail?`
    /// `else-tail := 'else' ( if-expr | '{' block '}' )`
    fn parse_if(&mut self) -> Result<Expr, Diagnostic> {
        let tok = self.peek().clone();
        self.advance(); // 'if'
        let cond = self.parse_expression()?;
        self.expect(Lexeme::LBrace, "Expected '{' to start 'then' block.")?;
        let then_block = self.parse_block()?;
        self.expect(Lexeme::RBrace, "Expected '}' to end 'then' block.")?;

        let else_block = if self.peek().kind == Lexeme::Else {
            self.advance();
            if self.peek().kind == Lexeme::If {
                let nested = self.parse_if()?;
                Block { exprs: vec![nested] }
            } else {
                self.expect(Lexeme::LBrace, "Expected '{' to start 'else' block.")?;
                let block = self.parse_block()?;
                self.expect(Lexeme::RBrace, "Expected '}' to end 'else' block.")?;
                block
            }
        } else {
            Block::default()
        };

        Ok(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_block,
                else_block,
            },
            Span::new(tok.line, tok.column),
        ))
    }

    /// `for-expr := 'for' IDENT '=' expression ',' expression (',' expression)? '{' block '}'`
    fn parse_for(&mut self) -> Result<Expr, Diagnostic> {
        let tok = self.peek().clone();
        self.advance(); // 'for'

        let var_tok = self.peek().clone();
        let var = match &var_tok.kind {
            Lexeme::Ident(name) => name.clone(),
            _ => return Err(self.error_here("Expected loop variable name after 'for'.")),
        };
        self.advance();

        self.expect(Lexeme::Eq, "Expected '=' after for-loop variable.")?;
        let start = self.parse_expression()?;
        self.expect(Lexeme::Comma, "Expected ',' after for-loop start expression.")?;
        let end = self.parse_expression()?;

        let step = if self.peek().kind == Lexeme::Comma {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        self.expect(Lexeme::LBrace, "Expected '{' to start for-loop body.")?;
        let body = self.parse_block()?;
        self.expect(Lexeme::RBrace, "Expected '}' to end for-loop body.")?;

        Ok(Expr::new(
            ExprKind::For {
                var,
                start: Box::new(start),
                end: Box::new(end),
                step,
                body,
            },
            Span::new(tok.line, tok.column),
        ))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: Lexeme, message: &str) -> Result<Token, Diagnostic> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Diagnostic {
        let tok = self.peek();
        Diagnostic::error(message, Span::new(tok.line, tok.column), tok.lexeme.clone())
    }
}

fn binop_from_lexeme(kind: &Lexeme) -> Option<BinOp> {
    match kind {
        Lexeme::Plus => Some(BinOp::Add),
        Lexeme::Minus => Some(BinOp::Sub),
        Lexeme::Star => Some(BinOp::Mul),
        Lexeme::Slash => Some(BinOp::Div),
        Lexeme::EqEq => Some(BinOp::Eq),
        Lexeme::Ne => Some(BinOp::Ne),
        Lexeme::Lt => Some(BinOp::Lt),
        Lexeme::Gt => Some(BinOp::Gt),
        Lexeme::Le => Some(BinOp::Le),
        Lexeme::Ge => Some(BinOp::Ge),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> File {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "unexpected scanner diagnostics: {:?}", diags);
        Parser::new(tokens)
            .parse_file()
            .unwrap_or_else(|e| panic!("unexpected parse error: {e}"))
    }

    fn parse_err(source: &str) -> Diagnostic {
        let (tokens, _diags) = Lexer::new(source).tokenize();
        Parser::new(tokens)
            .parse_file()
            .expect_err("expected a parse error")
    }

    #[test]
    fn test_empty_function() {
        let file = parse("fn f() { }");
        assert_eq!(file.len(), 1);
        assert_eq!(file[0].proto.node.name, "f");
        assert!(file[0].proto.node.params.is_empty());
        assert!(file[0].body.exprs.is_empty());
    }

    #[test]
    fn test_parameters() {
        let file = parse("fn add(a, b) { a }");
        assert_eq!(file[0].proto.node.params, vec!["a", "b"]);
    }

    #[test]
    fn test_precedence_tighter_first() {
        // a + b * c groups as a + (b * c)
        let file = parse("fn f() { a + b * c }");
        let ExprKind::BinaryOp { op, rhs, .. } = &file[0].body.exprs[0].node else {
            panic!("expected a binary op");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(rhs.node, ExprKind::BinaryOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_precedence_looser_first() {
        // a * b + c groups as (a * b) + c
        let file = parse("fn f() { a * b + c }");
        let ExprKind::BinaryOp { op, lhs, .. } = &file[0].body.exprs[0].node else {
            panic!("expected a binary op");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(lhs.node, ExprKind::BinaryOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_equal_precedence_is_left_associative() {
        // a - b - c groups as (a - b) - c
        let file = parse("fn f() { a - b - c }");
        let ExprKind::BinaryOp { op, lhs, rhs, .. } = &file[0].body.exprs[0].node else {
            panic!("expected a binary op");
        };
        assert_eq!(*op, BinOp::Sub);
        assert!(matches!(rhs.node, ExprKind::Variable(_)));
        assert!(matches!(lhs.node, ExprKind::BinaryOp { op: BinOp::Sub, .. }));
    }

    #[test]
    fn test_comparison_shares_tier_with_relational() {
        let file = parse("fn f() { a == b < c }");
        // Parses as a single left-to-right chain at precedence 7.
        assert!(matches!(file[0].body.exprs[0].node, ExprKind::BinaryOp { .. }));
    }

    #[test]
    fn test_assignment_is_idempotent_in_shape() {
        let a = parse("fn f() { x = 1 + 2; }");
        let b = parse("fn f() { x = 1 + 2; }");
        let ExprKind::Assign { value: va, .. } = &a[0].body.exprs[0].node else {
            panic!()
        };
        let ExprKind::Assign { value: vb, .. } = &b[0].body.exprs[0].node else {
            panic!()
        };
        assert_eq!(format!("{:?}", va.node), format!("{:?}", vb.node));
    }

    #[test]
    fn test_call_arguments() {
        let file = parse("fn f() { g(1, 2 + 3) }");
        let ExprKind::Call { callee, args } = &file[0].body.exprs[0].node else {
            panic!("expected a call")
        };
        assert_eq!(callee, "g");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_if_else_if_chain() {
        let file = parse("fn f(a) { if a < 0 { 0 } else if a > 10 { 10 } else { a } }");
        let ExprKind::If { else_block, .. } = &file[0].body.exprs[0].node else {
            panic!("expected an if")
        };
        assert_eq!(else_block.exprs.len(), 1);
        assert!(matches!(else_block.exprs[0].node, ExprKind::If { .. }));
    }

    #[test]
    fn test_for_loop_with_default_step() {
        let file = parse("fn f() { for i = 0, i < 3 { } }");
        let ExprKind::For { step, .. } = &file[0].body.exprs[0].node else {
            panic!("expected a for loop")
        };
        assert!(step.is_none());
    }

    #[test]
    fn test_for_loop_with_explicit_step() {
        let file = parse("fn f() { for i = 0, i < 3, 2 { } }");
        let ExprKind::For { step, .. } = &file[0].body.exprs[0].node else {
            panic!("expected a for loop")
        };
        assert!(step.is_some());
    }

    #[test]
    fn test_block_skips_bare_semicolons() {
        let file = parse("fn f() { ;; x = 1; ;; }");
        assert_eq!(file[0].body.exprs.len(), 1);
    }

    #[test]
    fn test_fatal_error_format() {
        let err = parse_err("fn f( { }");
        let message = err.to_string();
        assert!(message.starts_with("Line: 1 |"), "got: {message}");
        assert!(message.contains("Current token is =>"), "got: {message}");
    }

    #[test]
    fn test_unknown_primary_is_fatal() {
        let err = parse_err("fn f() { ) }");
        assert!(err.to_string().contains("Unknown token"));
    }
}
