//! Textual type expressions and capability declarations.
//!
//! Types use the canonical rendering produced by [`TypeExpr::canonical_name`], e.g.
//! `&Vec[int32]`, `[]rune`, `[int32;4]`, `(int32,bool)`, `dyn Show`. Declarations are one per
//! line: `impl[T] IntoIterable<Item=T> for Vec[T]` or `impl Copy for Point`. Blank lines and
//! `//` comments are ignored.

use crate::language::{
    capability::{Capability, ImplRule},
    errors::{SyntaxError, SyntaxErrors},
    span::Span,
    types::TypeExpr,
};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, multispace1, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult, Parser as NomParser,
};

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn path(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(tag("::"), identifier)).parse(input)
}

fn reference(input: &str) -> IResult<&str, TypeExpr> {
    let (input, _) = char('&').parse(input)?;
    let (input, mutable) = opt(terminated(tag("mut"), multispace1)).parse(input)?;
    let (input, ty) = type_expr(input)?;
    Ok((
        input,
        TypeExpr::Reference {
            mutable: mutable.is_some(),
            ty: Box::new(ty),
        },
    ))
}

fn slice(input: &str) -> IResult<&str, TypeExpr> {
    map(preceded(pair(char('['), ws(char(']'))), type_expr), |ty| {
        TypeExpr::Slice(Box::new(ty))
    })
    .parse(input)
}

fn array(input: &str) -> IResult<&str, TypeExpr> {
    map(
        delimited(
            char('['),
            tuple((
                ws(type_expr),
                char(';'),
                ws(map_res(digit1, |digits: &str| digits.parse::<usize>())),
            )),
            char(']'),
        ),
        |(ty, _, size)| TypeExpr::Array {
            size,
            ty: Box::new(ty),
        },
    )
    .parse(input)
}

fn tuple_or_unit(input: &str) -> IResult<&str, TypeExpr> {
    map(
        delimited(
            char('('),
            ws(separated_list0(char(','), ws(type_expr))),
            char(')'),
        ),
        |types| {
            if types.is_empty() {
                TypeExpr::Unit
            } else {
                TypeExpr::Tuple(types)
            }
        },
    )
    .parse(input)
}

fn dyn_object(input: &str) -> IResult<&str, TypeExpr> {
    map(preceded(pair(tag("dyn"), multispace1), path), |name| {
        TypeExpr::Dyn(name.to_string())
    })
    .parse(input)
}

fn named(input: &str) -> IResult<&str, TypeExpr> {
    map(
        pair(
            path,
            opt(delimited(
                char('['),
                separated_list1(char(','), ws(type_expr)),
                char(']'),
            )),
        ),
        |(name, args)| TypeExpr::Named(name.to_string(), args.unwrap_or_default()),
    )
    .parse(input)
}

fn type_expr(input: &str) -> IResult<&str, TypeExpr> {
    alt((reference, slice, array, tuple_or_unit, dyn_object, named)).parse(input)
}

fn type_params(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        char('['),
        separated_list1(char(','), ws(identifier)),
        char(']'),
    )
    .parse(input)
}

fn item_binding(input: &str) -> IResult<&str, TypeExpr> {
    delimited(
        pair(char('<'), ws(pair(tag("Item"), ws(char('='))))),
        type_expr,
        ws(char('>')),
    )
    .parse(input)
}

struct RawImpl<'a> {
    params: Vec<&'a str>,
    capability: &'a str,
    item: Option<TypeExpr>,
    target: TypeExpr,
}

fn impl_decl(input: &str) -> IResult<&str, RawImpl<'_>> {
    let (input, _) = terminated(tag("impl"), multispace0).parse(input)?;
    let (input, params) = opt(type_params).parse(input)?;
    let (input, capability) = ws(identifier).parse(input)?;
    let (input, item) = opt(item_binding).parse(input)?;
    let (input, _) = ws(terminated(tag("for"), multispace1)).parse(input)?;
    let (input, target) = ws(type_expr).parse(input)?;
    Ok((
        input,
        RawImpl {
            params: params.unwrap_or_default(),
            capability,
            item,
            target,
        },
    ))
}

fn error_at(source: &str, rest: &str, base: usize, message: &str) -> SyntaxError {
    let offset = base + source.len().saturating_sub(rest.len());
    SyntaxError::new(message, Span::new(offset, offset + rest.len().min(1)))
}

fn nom_error(source: &str, base: usize, err: nom::Err<nom::error::Error<&str>>, message: &str) -> SyntaxError {
    match err {
        nom::Err::Error(inner) | nom::Err::Failure(inner) => {
            error_at(source, inner.input, base, message)
        }
        nom::Err::Incomplete(_) => {
            SyntaxError::new(message, Span::new(base + source.len(), base + source.len()))
        }
    }
}

/// Parses a single type expression; surrounding whitespace is allowed.
pub fn parse_type(source: &str) -> Result<TypeExpr, SyntaxError> {
    all_consuming(ws(type_expr))
        .parse(source)
        .map(|(_, ty)| ty)
        .map_err(|err| {
            nom_error(source, 0, err, "expected a type").with_help(
                "types look like `int32`, `&Vec[int32]`, `[]rune`, `[int32;4]` or `(int32,bool)`",
            )
        })
}

/// Parses every `impl` line in `source`, reporting all malformed lines together.
pub fn parse_impl_rules(source: &str) -> Result<Vec<ImplRule>, SyntaxErrors> {
    let mut rules = Vec::new();
    let mut errors = Vec::new();
    let mut base = 0;
    for line in source.split_inclusive('\n') {
        let line_start = base;
        base += line.len();
        let content = line.split("//").next().unwrap_or_default();
        if content.trim().is_empty() {
            continue;
        }
        let span = Span::new(
            line_start + (content.len() - content.trim_start().len()),
            line_start + content.trim_end().len(),
        );
        match all_consuming(ws(impl_decl)).parse(content) {
            Ok((_, raw)) => match Capability::from_name(raw.capability) {
                Some(capability) => rules.push(ImplRule {
                    capability,
                    type_params: raw.params.iter().map(|p| p.to_string()).collect(),
                    target: raw.target,
                    item: raw.item,
                    span,
                }),
                None => errors.push(
                    SyntaxError::new(format!("unknown capability `{}`", raw.capability), span)
                        .with_help("expected `IntoIterable` or `Copy`"),
                ),
            },
            Err(err) => errors.push(
                nom_error(content, line_start, err, "malformed impl declaration")
                    .with_label("expected `impl[Params] Capability<Item=Type> for Type`"),
            ),
        }
    }
    if errors.is_empty() {
        Ok(rules)
    } else {
        Err(SyntaxErrors::new(errors))
    }
}
