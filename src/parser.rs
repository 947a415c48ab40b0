use std::rc::Rc;

use thiserror::Error;

use crate::ast::*;
use crate::reporter::{Reporter, StateTrackingReporter};
use crate::scanner::{Keyword, Symbol, Token, TokenType};

/// Calls and declarations are capped at this many arguments/parameters
pub const MAX_ARGUMENTS: usize = 255;

// Public error type that is returned from the API
// The individual causes have already been sent to the reporter
#[derive(Error, Debug)]
#[error("parse failed with {errors} error(s)")]
pub struct Error {
    pub errors: usize,
}

// For unwinding, we don't actually care that much about the internal cause which is reported through the reporter
#[derive(Error, Debug)]
#[error("internal parse error")]
struct ParsePanic {}

/// Cursor over the scanned tokens
/// Always ends in an EOF token, and never advances past it
struct Tokens {
    tokens: Vec<Token>,
    current: usize,
}

impl Tokens {
    fn new(mut tokens: Vec<Token>) -> Tokens {
        if tokens.last().map_or(true, |token| token.kind != TokenType::Eof) {
            let line = tokens.last().map_or(1, |token| token.line);
            tokens.push(Token::new(TokenType::Eof, "", None, line));
        }
        Tokens { tokens, current: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> Option<&Token> {
        self.current.checked_sub(1).map(|index| &self.tokens[index])
    }

    fn is_at_eof(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn next(&mut self) -> &Token {
        if !self.is_at_eof() {
            self.current += 1;
            &self.tokens[self.current - 1]
        } else {
            self.peek()
        }
    }

    fn next_if<F>(&mut self, predicate: F) -> Option<&Token>
    where
        F: FnOnce(&TokenType) -> bool,
    {
        if !self.is_at_eof() && predicate(&self.peek().kind) {
            Some(self.next())
        } else {
            None
        }
    }

    fn next_if_some<F, T>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(TokenType) -> Option<T>,
    {
        let result = f(self.peek().kind)?;
        self.next();
        Some(result)
    }
}

/// Parse a token sequence, failing if any error was reported
pub fn parse<R>(reporter: &mut R, tokens: Vec<Token>) -> Result<Program, Error>
where
    R: Reporter + ?Sized,
{
    let mut reporter = StateTrackingReporter::new(reporter);
    let program = parse_program(&mut reporter, tokens);
    if reporter.errored() {
        Err(Error {
            errors: reporter.reported(),
        })
    } else {
        Ok(program)
    }
}

/// Parse a token sequence into every statement that parsed cleanly
/// Malformed statements are reported, skipped and left out of the program
pub fn parse_program<R>(reporter: &mut R, tokens: Vec<Token>) -> Program
where
    R: Reporter + ?Sized,
{
    let mut tokens = Tokens::new(tokens);
    let mut stmts = Vec::<Stmt>::new();
    while !tokens.is_at_eof() {
        if let Some(stmt) = recovering_declaration(reporter, &mut tokens) {
            stmts.push(stmt);
        }
    }
    Program(stmts)
}

fn recovering_declaration<R>(reporter: &mut R, tokens: &mut Tokens) -> Option<Stmt>
where
    R: Reporter + ?Sized,
{
    match declaration(reporter, tokens) {
        Ok(stmt) => Some(stmt),
        Err(_) => {
            synchronize(tokens);
            None
        }
    }
}

fn synchronize(tokens: &mut Tokens) {
    // Step over the offending token, then stop after a ';' or before anything that starts a statement
    // Avoid consuming EOF since we can abort there
    tokens.next();
    while !tokens.is_at_eof() {
        if tokens
            .previous()
            .is_some_and(|token| token.kind == Symbol::Semicolon)
        {
            return;
        }
        match tokens.peek().kind {
            TokenType::Keyword(
                Keyword::Class
                | Keyword::Fun
                | Keyword::Var
                | Keyword::For
                | Keyword::If
                | Keyword::While
                | Keyword::Print
                | Keyword::Return,
            ) => return,
            _ => {
                tokens.next();
            }
        }
    }
}

fn error_at<R>(reporter: &mut R, token: &Token, message: &str) -> ParsePanic
where
    R: Reporter + ?Sized,
{
    if token.kind == TokenType::Eof {
        reporter.report(token.line, " at end", message);
    } else {
        reporter.report(token.line, &format!(" at '{}'", token.lexeme), message);
    }
    ParsePanic {}
}

/// Expect that the next token is the given symbol, consuming it
/// On a mismatch the token is left in place and reported
fn expect_symbol<R>(
    reporter: &mut R,
    tokens: &mut Tokens,
    symbol: Symbol,
    message: &str,
) -> Result<Token, ParsePanic>
where
    R: Reporter + ?Sized,
{
    match tokens.next_if(|next| *next == symbol) {
        Some(token) => Ok(token.clone()),
        None => Err(error_at(reporter, tokens.peek(), message)),
    }
}

fn expect_identifier<R>(
    reporter: &mut R,
    tokens: &mut Tokens,
    message: &str,
) -> Result<Token, ParsePanic>
where
    R: Reporter + ?Sized,
{
    match tokens.next_if(|next| *next == TokenType::Identifier) {
        Some(token) => Ok(token.clone()),
        None => Err(error_at(reporter, tokens.peek(), message)),
    }
}

fn declaration<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    if tokens.next_if(|next| *next == Keyword::Var).is_some() {
        finish_var_decl(reporter, tokens)
    } else if tokens.next_if(|next| *next == Keyword::Fun).is_some() {
        finish_fun_decl(reporter, tokens)
    } else {
        statement(reporter, tokens)
    }
}

fn finish_var_decl<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let name = expect_identifier(reporter, tokens, "Expect variable name.")?;
    let init = if tokens.next_if(|next| *next == Symbol::Equal).is_some() {
        Some(expr(reporter, tokens)?)
    } else {
        None
    };
    expect_symbol(
        reporter,
        tokens,
        Symbol::Semicolon,
        "Expect ';' after variable declaration.",
    )?;
    Ok(Stmt::VarDecl {
        name: name.lexeme,
        init,
    })
}

fn finish_fun_decl<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let name = expect_identifier(reporter, tokens, "Expect function name.")?;
    expect_symbol(
        reporter,
        tokens,
        Symbol::LeftParen,
        "Expect '(' after function name.",
    )?;

    let mut parameters = Vec::new();
    if tokens.peek().kind != Symbol::RightParen {
        loop {
            if parameters.len() >= MAX_ARGUMENTS {
                // Keep going, the declaration itself is still well formed
                error_at(reporter, tokens.peek(), "Can't have more than 255 parameters.");
            }
            let parameter = expect_identifier(reporter, tokens, "Expect parameter name.")?;
            parameters.push(parameter.lexeme);
            if tokens.next_if(|next| *next == Symbol::Comma).is_none() {
                break;
            }
        }
    }
    expect_symbol(
        reporter,
        tokens,
        Symbol::RightParen,
        "Expect ')' after parameters.",
    )?;
    expect_symbol(
        reporter,
        tokens,
        Symbol::LeftBrace,
        "Expect '{' before function body.",
    )?;
    let body = finish_block(reporter, tokens)?;
    Ok(Stmt::FunDecl(Rc::new(FunDecl {
        name: name.lexeme,
        line: name.line,
        parameters,
        body,
    })))
}

fn statement<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    if tokens.next_if(|next| *next == Keyword::If).is_some() {
        if_stmt(reporter, tokens)
    } else if tokens.next_if(|next| *next == Keyword::While).is_some() {
        while_stmt(reporter, tokens)
    } else if tokens.next_if(|next| *next == Keyword::For).is_some() {
        for_stmt(reporter, tokens)
    } else if tokens.next_if(|next| *next == Keyword::Print).is_some() {
        print_stmt(reporter, tokens)
    } else if let Some(keyword) = tokens.next_if(|next| *next == Keyword::Return) {
        let line = keyword.line;
        let expr = if tokens.peek().kind == Symbol::Semicolon {
            None
        } else {
            Some(expr(reporter, tokens)?)
        };
        expect_symbol(
            reporter,
            tokens,
            Symbol::Semicolon,
            "Expect ';' after return value.",
        )?;
        Ok(Stmt::Return { line, expr })
    } else if tokens.next_if(|next| *next == Symbol::LeftBrace).is_some() {
        Ok(Stmt::Block(finish_block(reporter, tokens)?))
    } else {
        expr_stmt(reporter, tokens)
    }
}

// Errors inside the block only discard the offending inner statement
fn finish_block<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Vec<Stmt>, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let mut stmts: Vec<Stmt> = Vec::new();
    while !tokens.is_at_eof() && tokens.peek().kind != Symbol::RightBrace {
        if let Some(stmt) = recovering_declaration(reporter, tokens) {
            stmts.push(stmt);
        }
    }
    expect_symbol(
        reporter,
        tokens,
        Symbol::RightBrace,
        "Expect '}' after block.",
    )?;
    Ok(stmts)
}

fn if_stmt<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    expect_symbol(reporter, tokens, Symbol::LeftParen, "Expect '(' after 'if'.")?;
    let test_expr = expr(reporter, tokens)?;
    expect_symbol(
        reporter,
        tokens,
        Symbol::RightParen,
        "Expect ')' after if condition.",
    )?;
    let then_branch = Box::new(statement(reporter, tokens)?);
    let else_branch = if tokens.next_if(|next| *next == Keyword::Else).is_some() {
        Some(Box::new(statement(reporter, tokens)?))
    } else {
        None
    };
    Ok(Stmt::If {
        expr: test_expr,
        then: then_branch,
        or_else: else_branch,
    })
}

fn while_stmt<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    expect_symbol(
        reporter,
        tokens,
        Symbol::LeftParen,
        "Expect '(' after 'while'.",
    )?;
    let expr = expr(reporter, tokens)?;
    expect_symbol(
        reporter,
        tokens,
        Symbol::RightParen,
        "Expect ')' after condition.",
    )?;
    let body = Box::new(statement(reporter, tokens)?);
    Ok(Stmt::While { expr, body })
}

// for loops have no node of their own, they are rewritten into a while loop inside a block
fn for_stmt<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let paren = expect_symbol(reporter, tokens, Symbol::LeftParen, "Expect '(' after 'for'.")?;
    let initializer = if tokens.next_if(|next| *next == Symbol::Semicolon).is_some() {
        None
    } else if tokens.next_if(|next| *next == Keyword::Var).is_some() {
        Some(finish_var_decl(reporter, tokens)?)
    } else {
        Some(expr_stmt(reporter, tokens)?)
    };

    let condition = if tokens.peek().kind == Symbol::Semicolon {
        Expr::new(paren.line, ExprInner::Literal(Literal::Boolean(true)))
    } else {
        expr(reporter, tokens)?
    };
    expect_symbol(
        reporter,
        tokens,
        Symbol::Semicolon,
        "Expect ';' after loop condition.",
    )?;

    let increment = if tokens.peek().kind == Symbol::RightParen {
        None
    } else {
        Some(Stmt::Expr(expr(reporter, tokens)?))
    };
    expect_symbol(
        reporter,
        tokens,
        Symbol::RightParen,
        "Expect ')' after for clauses.",
    )?;

    let mut body = statement(reporter, tokens)?;
    if let Some(increment) = increment {
        body = Stmt::Block(vec![body, increment]);
    }

    let for_loop = Stmt::While {
        expr: condition,
        body: Box::new(body),
    };

    if let Some(init) = initializer {
        Ok(Stmt::Block(vec![init, for_loop]))
    } else {
        Ok(for_loop)
    }
}

fn print_stmt<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let expr = expr(reporter, tokens)?;
    expect_symbol(reporter, tokens, Symbol::Semicolon, "Expect ';' after value.")?;
    Ok(Stmt::Print(expr))
}

fn expr_stmt<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Stmt, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let expr = expr(reporter, tokens)?;
    expect_symbol(
        reporter,
        tokens,
        Symbol::Semicolon,
        "Expect ';' after expression.",
    )?;
    Ok(Stmt::Expr(expr))
}

fn expr<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    assignment(reporter, tokens)
}

// The left hand side is parsed as an ordinary expression and only reinterpreted as a target once we see '='
fn assignment<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let expr = logical_or(reporter, tokens)?;
    let Some(equals) = tokens.next_if(|next| *next == Symbol::Equal).cloned() else {
        return Ok(expr);
    };
    // Right associative so a = b = c assigns c to both
    let value = Box::new(assignment(reporter, tokens)?);
    match expr.inner {
        ExprInner::Variable { name } => Ok(Expr::new(
            expr.line,
            ExprInner::Assignment {
                target: name,
                expr: value,
            },
        )),
        _ => Err(error_at(reporter, &equals, "Invalid assignment target.")),
    }
}

const EQUALITY_SYMBOLS: [Symbol; 2] = [Symbol::EqualEqual, Symbol::BangEqual];

const COMPARISON_SYMBOLS: [Symbol; 4] = [
    Symbol::Greater,
    Symbol::GreaterEqual,
    Symbol::Less,
    Symbol::LessEqual,
];

const TERM_SYMBOLS: [Symbol; 2] = [Symbol::Minus, Symbol::Plus];

const FACTOR_SYMBOLS: [Symbol; 2] = [Symbol::Star, Symbol::Slash];

// Binary symbols that can't start an expression. Used for error production in primary to recover when we see one
// without a left hand operand ('-' is excluded since it is also unary)
const BINARY_ONLY_SYMBOLS: [Symbol; 9] = [
    Symbol::EqualEqual,
    Symbol::BangEqual,
    Symbol::Greater,
    Symbol::GreaterEqual,
    Symbol::Less,
    Symbol::LessEqual,
    Symbol::Plus,
    Symbol::Star,
    Symbol::Slash,
];

fn logical_or<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    left_recursive_logical_op(reporter, tokens, Keyword::Or, logical_and)
}

fn logical_and<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    left_recursive_logical_op(reporter, tokens, Keyword::And, equality)
}

fn equality<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    left_recursive_binary_op(reporter, tokens, &EQUALITY_SYMBOLS, comparison)
}

fn comparison<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    left_recursive_binary_op(reporter, tokens, &COMPARISON_SYMBOLS, term)
}

fn term<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    left_recursive_binary_op(reporter, tokens, &TERM_SYMBOLS, factor)
}

fn factor<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    left_recursive_binary_op(reporter, tokens, &FACTOR_SYMBOLS, unary)
}

const UNARY_SYMBOLS: [Symbol; 2] = [Symbol::Minus, Symbol::Bang];

fn unary<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let line = tokens.peek().line;
    if let Some(symbol) = tokens.next_if_some(|next| match next {
        TokenType::Symbol(symbol) if UNARY_SYMBOLS.contains(&symbol) => Some(symbol),
        _ => None,
    }) {
        let right = Box::new(unary(reporter, tokens)?);
        Ok(Expr::new(
            line,
            ExprInner::Unary {
                op: symbol_to_unary_op(symbol),
                expr: right,
            },
        ))
    } else {
        call(reporter, tokens)
    }
}

fn call<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let mut expr = primary(reporter, tokens)?;
    while tokens.next_if(|next| *next == Symbol::LeftParen).is_some() {
        expr = finish_call(reporter, tokens, expr)?;
    }
    Ok(expr)
}

fn finish_call<R>(reporter: &mut R, tokens: &mut Tokens, callee: Expr) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let mut arguments = Vec::new();
    if tokens.peek().kind != Symbol::RightParen {
        loop {
            if arguments.len() >= MAX_ARGUMENTS {
                error_at(reporter, tokens.peek(), "Can't have more than 255 arguments.");
            }
            arguments.push(expr(reporter, tokens)?);
            if tokens.next_if(|next| *next == Symbol::Comma).is_none() {
                break;
            }
        }
    }
    // Runtime errors for the call are blamed on the closing paren
    let paren = expect_symbol(
        reporter,
        tokens,
        Symbol::RightParen,
        "Expect ')' after arguments.",
    )?;
    Ok(Expr::new(
        paren.line,
        ExprInner::Call {
            callee: Box::new(callee),
            arguments,
        },
    ))
}

fn primary<R>(reporter: &mut R, tokens: &mut Tokens) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
{
    let token = tokens.peek().clone();
    let inner = match token.kind {
        TokenType::Keyword(Keyword::True) => ExprInner::Literal(Literal::Boolean(true)),
        TokenType::Keyword(Keyword::False) => ExprInner::Literal(Literal::Boolean(false)),
        TokenType::Keyword(Keyword::Nil) => ExprInner::Literal(Literal::Nil),
        // The scanner always attaches a payload to these
        TokenType::String | TokenType::Number => {
            ExprInner::Literal(token.literal.clone().unwrap_or(Literal::Nil))
        }
        TokenType::Identifier => ExprInner::Variable {
            name: token.lexeme.clone(),
        },
        TokenType::Symbol(Symbol::LeftParen) => {
            tokens.next();
            let inner = expr(reporter, tokens)?;
            expect_symbol(
                reporter,
                tokens,
                Symbol::RightParen,
                "Expect ')' after expression.",
            )?;
            return Ok(Expr::new(token.line, ExprInner::Group(Box::new(inner))));
        }
        // Leave the operator in place, synchronize steps over it
        TokenType::Symbol(symbol) if BINARY_ONLY_SYMBOLS.contains(&symbol) => {
            return Err(error_at(
                reporter,
                &token,
                "Binary operator without a left-hand side.",
            ));
        }
        _ => return Err(error_at(reporter, &token, "Expect expression.")),
    };
    tokens.next();
    Ok(Expr::new(token.line, inner))
}

fn left_recursive_binary_op<R, F>(
    reporter: &mut R,
    tokens: &mut Tokens,
    symbols: &[Symbol],
    higher_precedence: F,
) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
    F: Fn(&mut R, &mut Tokens) -> Result<Expr, ParsePanic>,
{
    let mut expr = higher_precedence(reporter, tokens)?;
    loop {
        let line = tokens.peek().line;
        let Some(symbol) = tokens.next_if_some(|next| match next {
            TokenType::Symbol(s) if symbols.contains(&s) => Some(s),
            _ => None,
        }) else {
            break;
        };
        let right = Box::new(higher_precedence(reporter, tokens)?);
        expr = Expr::new(
            line,
            ExprInner::Binary {
                left: Box::new(expr),
                op: symbol_to_binary_op(symbol),
                right,
            },
        );
    }
    Ok(expr)
}

fn left_recursive_logical_op<R, F>(
    reporter: &mut R,
    tokens: &mut Tokens,
    keyword: Keyword,
    higher_precedence: F,
) -> Result<Expr, ParsePanic>
where
    R: Reporter + ?Sized,
    F: Fn(&mut R, &mut Tokens) -> Result<Expr, ParsePanic>,
{
    let mut expr = higher_precedence(reporter, tokens)?;
    while let Some(line) = tokens.next_if(|next| *next == keyword).map(|token| token.line) {
        let right = Box::new(higher_precedence(reporter, tokens)?);
        expr = Expr::new(
            line,
            ExprInner::Logical {
                left: Box::new(expr),
                op: keyword_to_logical_op(keyword),
                right,
            },
        );
    }
    Ok(expr)
}

fn symbol_to_binary_op(symbol: Symbol) -> BinaryOp {
    match symbol {
        Symbol::EqualEqual => BinaryOp::Equal,
        Symbol::BangEqual => BinaryOp::NotEqual,
        Symbol::Less => BinaryOp::LessThan,
        Symbol::LessEqual => BinaryOp::LessThanEqual,
        Symbol::Greater => BinaryOp::GreaterThan,
        Symbol::GreaterEqual => BinaryOp::GreaterThanEqual,
        Symbol::Plus => BinaryOp::Add,
        Symbol::Minus => BinaryOp::Subtract,
        Symbol::Star => BinaryOp::Multiply,
        Symbol::Slash => BinaryOp::Divide,
        s => unreachable!("symbol was not a valid binary operator: {}", s),
    }
}

fn keyword_to_logical_op(kw: Keyword) -> LogicalOp {
    match kw {
        Keyword::And => LogicalOp::And,
        Keyword::Or => LogicalOp::Or,
        kw => unreachable!("keyword was not a valid logical operator: {}", kw),
    }
}

fn symbol_to_unary_op(symbol: Symbol) -> UnaryOp {
    match symbol {
        Symbol::Bang => UnaryOp::Not,
        Symbol::Minus => UnaryOp::Negative,
        s => unreachable!("symbol was not a valid unary operator: {}", s),
    }
}
