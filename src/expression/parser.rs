// src/expression/parser.rs
//! Grammar for expression bodies, built from `nom` combinators over the
//! token parsers in `lexer`.

use nom::{
    branch::alt,
    combinator::{cut, eof, map, opt, value, verify},
    error::context,
    multi::{many0, separated_list0},
    sequence::{delimited, preceded, separated_pair, terminated},
};

use super::ExpressionError;
use super::lexer::{
    PResult, Punct, Span, SyntaxError, SyntaxErrorKind, identifier, number, punct, string_literal, trivia,
};

/// Nesting limit for blocks, parentheses, unary chains and operator chains.
pub const MAX_DEPTH: usize = 64;

const RESERVED: &[&str] = &[
    "return", "if", "else", "const", "let", "var", "true", "false", "null", "undefined", "typeof",
];

const CALL_HINT: &str = "a method call on a property (e.g. value.includes(x))";

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Return(Option<Expr>),
    Declare { name: String, init: Expr },
    If {
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    Expr(Expr),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        optional: bool,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

/// Parses a whole function body.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ExpressionError> {
    let parsed = terminated(
        many0(|i| statement(i, 0)),
        cut(context("a statement", preceded(trivia, eof))),
    )(Span::new(source));

    match parsed {
        Ok((_, body)) => Ok(body),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(e.into_expression_error(source)),
        Err(nom::Err::Incomplete(_)) => Err(ExpressionError::Syntax {
            position: source.len(),
            message: "unexpected end of input".to_string(),
        }),
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|reserved| *reserved == word)
}

fn enter(input: Span<'_>, depth: usize) -> Result<usize, nom::Err<SyntaxError>> {
    if depth >= MAX_DEPTH {
        return Err(nom::Err::Failure(SyntaxError::at(
            input,
            SyntaxErrorKind::TooDeep(MAX_DEPTH),
        )));
    }
    Ok(depth + 1)
}

fn sym<'a>(expected: Punct) -> impl FnMut(Span<'a>) -> PResult<'a, Punct> {
    preceded(trivia, verify(punct, move |found: &Punct| *found == expected))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    preceded(
        trivia,
        verify(identifier, move |found: &Span<'a>| *found.fragment() == word),
    )
}

fn statement(input: Span<'_>, depth: usize) -> PResult<'_, Stmt> {
    let depth = enter(input, depth)?;
    alt((
        value(Stmt::Empty, sym(Punct::Semicolon)),
        |i| block(i, depth),
        |i| return_statement(i, depth),
        |i| declaration(i, depth),
        |i| if_statement(i, depth),
        |i| expression_statement(i, depth),
    ))(input)
}

fn block(input: Span<'_>, depth: usize) -> PResult<'_, Stmt> {
    let (input, _) = sym(Punct::LBrace)(input)?;
    let (input, body) = many0(|i| statement(i, depth))(input)?;
    let (input, _) = cut(context("'}'", sym(Punct::RBrace)))(input)?;
    Ok((input, Stmt::Block(body)))
}

fn return_statement(input: Span<'_>, depth: usize) -> PResult<'_, Stmt> {
    let (input, _) = keyword("return")(input)?;
    if at_statement_end(input) {
        let (input, _) = end_statement(input)?;
        return Ok((input, Stmt::Return(None)));
    }
    let (input, returned) = cut(|i| expression(i, depth))(input)?;
    let (input, _) = end_statement(input)?;
    Ok((input, Stmt::Return(Some(returned))))
}

fn declaration(input: Span<'_>, depth: usize) -> PResult<'_, Stmt> {
    let (input, _) = alt((keyword("const"), keyword("let"), keyword("var")))(input)?;
    let (input, name) = cut(context("a variable name", binding_name))(input)?;
    let (input, _) = cut(context("'='", sym(Punct::Assign)))(input)?;
    let (input, init) = cut(|i| expression(i, depth))(input)?;
    let (input, _) = end_statement(input)?;
    Ok((input, Stmt::Declare { name, init }))
}

fn binding_name(input: Span<'_>) -> PResult<'_, String> {
    map(
        preceded(
            trivia,
            verify(identifier, |word: &Span<'_>| !is_reserved(word.fragment())),
        ),
        |word: Span<'_>| word.fragment().to_string(),
    )(input)
}

fn if_statement(input: Span<'_>, depth: usize) -> PResult<'_, Stmt> {
    let (input, _) = keyword("if")(input)?;
    let (input, condition) = cut(delimited(
        context("'('", sym(Punct::LParen)),
        |i| expression(i, depth),
        context("')'", sym(Punct::RParen)),
    ))(input)?;
    let (input, then) = cut(context("a statement", |i| statement(i, depth)))(input)?;
    let (input, otherwise) = opt(preceded(
        keyword("else"),
        cut(context("a statement", |i| statement(i, depth))),
    ))(input)?;
    Ok((
        input,
        Stmt::If {
            condition,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        },
    ))
}

fn expression_statement(input: Span<'_>, depth: usize) -> PResult<'_, Stmt> {
    let (input, expr) = expression(input, depth)?;
    let (input, _) = end_statement(input)?;
    Ok((input, Stmt::Expr(expr)))
}

fn at_statement_end(input: Span<'_>) -> bool {
    match trivia(input) {
        Ok((rest, newline)) => {
            newline
                || rest.fragment().is_empty()
                || rest.fragment().starts_with(|c: char| c == ';' || c == '}')
        }
        Err(_) => false,
    }
}

/// Consumes a `;`, or accepts a line break, `}` or end of input in its place.
fn end_statement(input: Span<'_>) -> PResult<'_, ()> {
    if at_statement_end(input) {
        return value((), opt(sym(Punct::Semicolon)))(input);
    }
    value((), cut(context("';'", sym(Punct::Semicolon))))(input)
}

fn expression(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    let depth = enter(input, depth)?;
    let (input, condition) = binary(input, 1, depth)?;
    let (input, branches) = opt(preceded(
        sym(Punct::Question),
        cut(separated_pair(
            |i| expression(i, depth),
            context("':'", sym(Punct::Colon)),
            |i| expression(i, depth),
        )),
    ))(input)?;

    let expr = match branches {
        Some((then, otherwise)) => Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        },
        None => condition,
    };
    Ok((input, expr))
}

/// Precedence climbing; every operator link counts toward the depth limit.
fn binary(input: Span<'_>, min_precedence: u8, depth: usize) -> PResult<'_, Expr> {
    let (mut input, mut left) = unary(input, depth)?;
    let mut depth = depth;
    loop {
        let (after, (precedence, op)) = match binary_op(input) {
            Ok(found) => found,
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        };
        if precedence < min_precedence {
            break;
        }
        depth = enter(after, depth)?;
        let (rest, right) = cut(|i| binary(i, precedence + 1, depth))(after)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
        input = rest;
    }
    Ok((input, left))
}

fn binary_op(input: Span<'_>) -> PResult<'_, (u8, BinaryOp)> {
    let (rest, found) = preceded(trivia, punct)(input)?;
    let entry = match found {
        Punct::OrOr => (1, BinaryOp::Or),
        Punct::Nullish => (1, BinaryOp::Nullish),
        Punct::AndAnd => (2, BinaryOp::And),
        Punct::StrictEq => (3, BinaryOp::StrictEq),
        Punct::StrictNe => (3, BinaryOp::StrictNe),
        Punct::LooseEq => (3, BinaryOp::LooseEq),
        Punct::LooseNe => (3, BinaryOp::LooseNe),
        Punct::Lt => (4, BinaryOp::Lt),
        Punct::Le => (4, BinaryOp::Le),
        Punct::Gt => (4, BinaryOp::Gt),
        Punct::Ge => (4, BinaryOp::Ge),
        Punct::Plus => (5, BinaryOp::Add),
        Punct::Minus => (5, BinaryOp::Sub),
        Punct::Star => (6, BinaryOp::Mul),
        Punct::Slash => (6, BinaryOp::Div),
        Punct::Percent => (6, BinaryOp::Rem),
        _ => {
            return Err(nom::Err::Error(SyntaxError::at(
                input,
                SyntaxErrorKind::Expected(None),
            )));
        }
    };
    Ok((rest, entry))
}

fn unary(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    let prefix: PResult<'_, UnaryOp> = alt((
        value(UnaryOp::Not, sym(Punct::Bang)),
        value(UnaryOp::Neg, sym(Punct::Minus)),
        value(UnaryOp::Plus, sym(Punct::Plus)),
        value(UnaryOp::TypeOf, keyword("typeof")),
    ))(input);

    match prefix {
        Ok((rest, op)) => {
            let depth = enter(rest, depth)?;
            let (rest, operand) = cut(|i| unary(i, depth))(rest)?;
            Ok((rest, Expr::Unary(op, Box::new(operand))))
        }
        Err(nom::Err::Error(_)) => postfix(input, depth),
        Err(e) => Err(e),
    }
}

fn postfix(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    let (mut input, mut expr) = primary(input, depth)?;
    let mut depth = depth;
    loop {
        let next: PResult<'_, Punct> = preceded(trivia, punct)(input);
        let (after, link) = match next {
            Ok(found) => found,
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        };
        let optional = match link {
            Punct::Dot => false,
            Punct::QuestionDot => true,
            Punct::LBracket => {
                depth = enter(after, depth)?;
                let (rest, index) = index_body(after, depth)?;
                expr = Expr::Index { object: Box::new(expr), index: Box::new(index), optional: false };
                input = rest;
                continue;
            }
            Punct::LParen => {
                let (at, _) = trivia(input)?;
                return Err(nom::Err::Failure(SyntaxError::at(
                    at,
                    SyntaxErrorKind::Expected(Some(CALL_HINT)),
                )));
            }
            _ => break,
        };
        depth = enter(after, depth)?;

        if optional {
            let bracket: PResult<'_, Punct> = sym(Punct::LBracket)(after);
            if let Ok((after, _)) = bracket {
                let (rest, index) = index_body(after, depth)?;
                expr = Expr::Index { object: Box::new(expr), index: Box::new(index), optional: true };
                input = rest;
                continue;
            }
        }

        let (rest, property) = cut(context("a property name", property_name))(after)?;
        let (rest, args) = opt(|i| arguments(i, depth))(rest)?;
        expr = match args {
            Some(args) => Expr::MethodCall { object: Box::new(expr), method: property, args, optional },
            None => Expr::Member { object: Box::new(expr), property, optional },
        };
        input = rest;
    }
    Ok((input, expr))
}

/// The index expression and closing `]` after an opening bracket.
fn index_body(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    cut(terminated(
        |i| expression(i, depth),
        context("']'", sym(Punct::RBracket)),
    ))(input)
}

fn property_name(input: Span<'_>) -> PResult<'_, String> {
    // Reserved words are fine after a dot: `response.return` is a plain key.
    map(preceded(trivia, identifier), |word: Span<'_>| word.fragment().to_string())(input)
}

fn arguments(input: Span<'_>, depth: usize) -> PResult<'_, Vec<Expr>> {
    preceded(
        sym(Punct::LParen),
        cut(terminated(
            separated_list0(sym(Punct::Comma), |i| expression(i, depth)),
            context("',' or ')'", sym(Punct::RParen)),
        )),
    )(input)
}

fn primary(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    context(
        "an expression",
        alt((
            map(preceded(trivia, number), |n| Expr::Literal(Literal::Number(n))),
            map(preceded(trivia, string_literal), |s| Expr::Literal(Literal::Str(s))),
            |i| parenthesized(i, depth),
            word_expression,
        )),
    )(input)
}

fn parenthesized(input: Span<'_>, depth: usize) -> PResult<'_, Expr> {
    preceded(
        sym(Punct::LParen),
        cut(terminated(
            |i| expression(i, depth),
            context("')'", sym(Punct::RParen)),
        )),
    )(input)
}

fn word_expression(input: Span<'_>) -> PResult<'_, Expr> {
    let (rest, word) = preceded(trivia, identifier)(input)?;
    let expr = match *word.fragment() {
        "true" => Expr::Literal(Literal::Bool(true)),
        "false" => Expr::Literal(Literal::Bool(false)),
        "null" => Expr::Literal(Literal::Null),
        "undefined" => Expr::Literal(Literal::Undefined),
        reserved if is_reserved(reserved) => {
            return Err(nom::Err::Error(SyntaxError::at(
                word,
                SyntaxErrorKind::Expected(None),
            )));
        }
        name => Expr::Ident(name.to_string()),
    };
    Ok((rest, expr))
}
