use std::fmt::{Debug, Display, Formatter};

use nom::character::complete::{char, digit1, satisfy};
use nom::combinator::{all_consuming, map, map_res, opt, recognize};
use nom::error::{ContextError, ErrorKind, FromExternalError, ParseError};
use nom::multi::many0;
use nom::number::complete::double;
use nom::sequence::{pair, tuple};
use nom::{AsChar, IResult};

pub enum ParserError<I> {
    Custom(anyhow::Error),
    Nom(I, ErrorKind),
    Context(&'static str, I),
}

impl<I: Debug> Debug for ParserError<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(error) => f.write_fmt(format_args!("Semantic error at {}", error)),
            Self::Nom(input, error) => f.write_fmt(format_args!(
                "Parser error at '{:?}': expecting {:?}",
                input, error
            )),
            Self::Context(context, input) => {
                f.write_fmt(format_args!("Expected {} at {:?}", context, input))
            }
        }
    }
}

impl<I> ParseError<I> for ParserError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        ParserError::Nom(input, kind)
    }

    fn append(_: I, _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<I> ContextError<I> for ParserError<I> {
    fn add_context(input: I, context: &'static str, other: Self) -> Self {
        match other {
            // Keep the innermost context
            ParserError::Context(..) | ParserError::Custom(_) => other,
            ParserError::Nom(..) => ParserError::Context(context, input),
        }
    }
}

impl<I: Display, E: Into<anyhow::Error>> FromExternalError<I, E> for ParserError<I> {
    fn from_external_error(input: I, _: ErrorKind, error: E) -> Self {
        ParserError::Custom(anyhow::anyhow!("'{}': {}", input, error.into()))
    }
}

pub(crate) fn format_parse_error<I: Debug>(error: nom::Err<ParserError<I>>) -> anyhow::Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => anyhow::anyhow!("{:?}", e),
        _ => anyhow::anyhow!(error.to_string()),
    }
}

pub type NomResult<'a, Ret> = IResult<&'a str, Ret, ParserError<&'a str>>;

/// Runs the parser and makes sure that it has consumed the whole input.
pub fn consume_all<'a, O, F>(parser: F, input: &'a str) -> anyhow::Result<O>
where
    F: FnMut(&'a str) -> NomResult<'a, O>,
{
    all_consuming(parser)(input)
        .map(|(_, output)| output)
        .map_err(format_parse_error)
}

fn p_integer_string(input: &str) -> NomResult<String> {
    let parser = tuple((
        satisfy(|c| c.is_dec_digit()),
        many0(satisfy(|c| c.is_dec_digit() || c == '_')),
    ));
    map(parser, |(first, rest)| {
        let mut number = first.to_string();
        number.extend(rest.into_iter().filter(|c| c.is_dec_digit()));
        number
    })(input)
}

pub fn p_u32(input: &str) -> NomResult<u32> {
    map_res(p_integer_string, |number| number.parse::<u32>())(input)
}

/// Parses an unsigned integer made of plain digits, without `_` separators.
pub fn p_u64(input: &str) -> NomResult<u64> {
    map_res(digit1, |number: &str| number.parse::<u64>())(input)
}

/// Parses an integer made of plain digits with an optional leading minus sign.
pub fn p_i64(input: &str) -> NomResult<i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |number: &str| {
        number.parse::<i64>()
    })(input)
}

/// Parses a real number (`12`, `0.5`, `1e3`, ...).
pub fn p_f64(input: &str) -> NomResult<f64> {
    double(input)
}
