// src/expression/lexer.rs
//! Token-level parsers: trivia, literals, identifiers and punctuation.
//!
//! Every parser works on a [`Span`] so failures carry their byte offset into
//! the source. Callers skip [`trivia`] before each token.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while_m_n},
    character::complete::{anychar, char, digit0, digit1, hex_digit1, one_of, satisfy},
    combinator::{not, opt, recognize, value},
    error::{ContextError, ErrorKind, ParseError},
    multi::fold_many0,
    sequence::{pair, preceded, terminated, tuple},
};
use nom_locate::LocatedSpan;

use super::ExpressionError;
use super::value::parse_hex;

pub type Span<'a> = LocatedSpan<&'a str>;
pub type PResult<'a, O> = IResult<Span<'a>, O, SyntaxError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxErrorKind {
    /// Nothing matched; carries what was wanted once a context names it.
    Expected(Option<&'static str>),
    Message(String),
    TooDeep(usize),
}

/// Parse failure at a byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub position: usize,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    pub fn at(input: Span<'_>, kind: SyntaxErrorKind) -> Self {
        Self {
            position: input.location_offset(),
            kind,
        }
    }

    /// Renders the failure against the full `source`.
    pub fn into_expression_error(self, source: &str) -> ExpressionError {
        let position = self.position;
        let found = || describe_next(Span::new(source.get(position..).unwrap_or("")));
        let message = match self.kind {
            SyntaxErrorKind::TooDeep(limit) => return ExpressionError::TooDeep(limit),
            SyntaxErrorKind::Message(message) => message,
            SyntaxErrorKind::Expected(Some(wanted)) => format!("expected {}, found {}", wanted, found()),
            SyntaxErrorKind::Expected(None) => format!("unexpected {}", found()),
        };
        ExpressionError::Syntax { position, message }
    }

    fn is_labelled(&self) -> bool {
        self.kind != SyntaxErrorKind::Expected(None)
    }
}

impl<'a> ParseError<Span<'a>> for SyntaxError {
    fn from_error_kind(input: Span<'a>, _kind: ErrorKind) -> Self {
        Self::at(input, SyntaxErrorKind::Expected(None))
    }

    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    /// Keeps whichever alternative got further, preferring a labelled one.
    fn or(self, other: Self) -> Self {
        if other.position > self.position
            || (other.position == self.position && !self.is_labelled())
        {
            other
        } else {
            self
        }
    }
}

impl<'a> ContextError<Span<'a>> for SyntaxError {
    /// The innermost context wins.
    fn add_context(_input: Span<'a>, context: &'static str, mut other: Self) -> Self {
        if !other.is_labelled() {
            other.kind = SyntaxErrorKind::Expected(Some(context));
        }
        other
    }
}

/// An unrecoverable error at `input`.
pub fn failure(input: Span<'_>, message: &str) -> nom::Err<SyntaxError> {
    nom::Err::Failure(SyntaxError::at(input, SyntaxErrorKind::Message(message.to_string())))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    QuestionDot,
    Comma,
    Semicolon,
    Question,
    Colon,
    Bang,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    LooseEq,
    StrictEq,
    LooseNe,
    StrictNe,
    AndAnd,
    OrOr,
    Nullish,
}

impl std::fmt::Display for Punct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Dot => ".",
            Punct::QuestionDot => "?.",
            Punct::Comma => ",",
            Punct::Semicolon => ";",
            Punct::Question => "?",
            Punct::Colon => ":",
            Punct::Bang => "!",
            Punct::Assign => "=",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Ge => ">=",
            Punct::LooseEq => "==",
            Punct::StrictEq => "===",
            Punct::LooseNe => "!=",
            Punct::StrictNe => "!==",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::Nullish => "??",
        };
        f.write_str(text)
    }
}

/// Longest match first.
pub fn punct(input: Span<'_>) -> PResult<'_, Punct> {
    alt((
        alt((
            value(Punct::StrictEq, tag("===")),
            value(Punct::StrictNe, tag("!==")),
            value(Punct::LooseEq, tag("==")),
            value(Punct::LooseNe, tag("!=")),
            value(Punct::Le, tag("<=")),
            value(Punct::Ge, tag(">=")),
            value(Punct::AndAnd, tag("&&")),
            value(Punct::OrOr, tag("||")),
            value(Punct::Nullish, tag("??")),
            // `a?.5:1` is a ternary, not optional chaining.
            value(
                Punct::QuestionDot,
                terminated(tag("?."), not(satisfy(|c: char| c.is_ascii_digit()))),
            ),
        )),
        alt((
            value(Punct::LParen, char('(')),
            value(Punct::RParen, char(')')),
            value(Punct::LBrace, char('{')),
            value(Punct::RBrace, char('}')),
            value(Punct::LBracket, char('[')),
            value(Punct::RBracket, char(']')),
            value(Punct::Dot, char('.')),
            value(Punct::Comma, char(',')),
            value(Punct::Semicolon, char(';')),
            value(Punct::Question, char('?')),
            value(Punct::Colon, char(':')),
            value(Punct::Bang, char('!')),
            value(Punct::Assign, char('=')),
            value(Punct::Plus, char('+')),
            value(Punct::Minus, char('-')),
            value(Punct::Star, char('*')),
            value(Punct::Slash, char('/')),
            value(Punct::Percent, char('%')),
            value(Punct::Lt, char('<')),
            value(Punct::Gt, char('>')),
        )),
    ))(input)
}

/// Skips whitespace and comments; `true` when a line break was skipped.
pub fn trivia(input: Span<'_>) -> PResult<'_, bool> {
    let mut rest = input;
    let mut newline = false;
    loop {
        let (after, space) = take_while(|c: char| c.is_whitespace())(rest)?;
        newline |= space.fragment().contains('\n');
        rest = after;
        match comment(rest) {
            Ok((after, text)) => {
                newline |= text.fragment().contains('\n');
                rest = after;
            }
            Err(nom::Err::Error(_)) => return Ok((rest, newline)),
            Err(e) => return Err(e),
        }
    }
}

fn comment(input: Span<'_>) -> PResult<'_, Span<'_>> {
    alt((line_comment, block_comment))(input)
}

fn line_comment(input: Span<'_>) -> PResult<'_, Span<'_>> {
    preceded(tag("//"), take_while(|c: char| c != '\n'))(input)
}

fn block_comment(input: Span<'_>) -> PResult<'_, Span<'_>> {
    let (body, _) = tag("/*")(input)?;
    let closed: PResult<'_, Span<'_>> = terminated(take_until("*/"), tag("*/"))(body);
    closed.map_err(|_| failure(input, "unterminated comment"))
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Identifiers and reserved words alike; the grammar tells them apart.
pub fn identifier(input: Span<'_>) -> PResult<'_, Span<'_>> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '$'),
        take_while(is_identifier_char),
    ))(input)
}

pub fn number(input: Span<'_>) -> PResult<'_, f64> {
    let (rest, value) = alt((hex_number, decimal_number))(input)?;
    if rest.fragment().starts_with(is_identifier_char) {
        return Err(failure(rest, "identifier starts immediately after number"));
    }
    Ok((rest, value))
}

fn hex_number(input: Span<'_>) -> PResult<'_, f64> {
    let (rest, digits) = preceded(alt((tag("0x"), tag("0X"))), hex_digit1)(input)?;
    Ok((rest, parse_hex(digits.fragment())))
}

fn decimal_number(input: Span<'_>) -> PResult<'_, f64> {
    let (rest, text) = recognize(pair(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    ))(input)?;
    match text.fragment().parse::<f64>() {
        Ok(value) => Ok((rest, value)),
        Err(_) => Err(failure(input, "invalid number literal")),
    }
}

/// A single- or double-quoted string with JavaScript escapes.
pub fn string_literal(input: Span<'_>) -> PResult<'_, String> {
    let (body, quote) = one_of("\"'")(input)?;
    let (rest, text) = fold_many0(
        |i| string_char(i, quote),
        String::new,
        |mut text, c| {
            text.push(c);
            text
        },
    )(body)?;
    let closed: PResult<'_, char> = char(quote)(rest);
    match closed {
        Ok((rest, _)) => Ok((rest, text)),
        Err(_) => Err(failure(input, "unterminated string")),
    }
}

fn string_char(input: Span<'_>, quote: char) -> PResult<'_, char> {
    alt((
        preceded(char('\\'), escape),
        satisfy(move |c: char| c != quote && c != '\\' && c != '\n'),
    ))(input)
}

fn escape(input: Span<'_>) -> PResult<'_, char> {
    alt((
        value('\n', char('n')),
        value('\r', char('r')),
        value('\t', char('t')),
        value('\0', char('0')),
        preceded(char('u'), unicode_escape),
        anychar,
    ))(input)
}

fn unicode_escape(input: Span<'_>) -> PResult<'_, char> {
    let digits: PResult<'_, Span<'_>> = take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit())(input);
    let decoded = digits.ok().and_then(|(rest, digits)| {
        u32::from_str_radix(digits.fragment(), 16)
            .ok()
            .and_then(char::from_u32)
            .map(|c| (rest, c))
    });
    decoded.ok_or_else(|| failure(input, "invalid unicode escape"))
}

/// Names the token at `input` for error messages.
pub fn describe_next(input: Span<'_>) -> String {
    let rest = trivia(input).map(|(rest, _)| rest).unwrap_or(input);
    let Some(first) = rest.fragment().chars().next() else {
        return "end of input".to_string();
    };
    if let Ok((_, n)) = number(rest) {
        return format!("number {}", n);
    }
    if let Ok((_, s)) = string_literal(rest) {
        return format!("string {:?}", s);
    }
    if let Ok((_, word)) = identifier(rest) {
        return format!("'{}'", word.fragment());
    }
    if let Ok((_, p)) = punct(rest) {
        return format!("'{}'", p);
    }
    format!("{:?}", first)
}
