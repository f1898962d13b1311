use nom::number::complete::{le_f64, le_u32, le_u8};

use ember_ast::arena::ExprId;
use ember_ast::expr::Expr;
use ember_ast::name::NameId;
use ember_ast::pos::Location;
use ember_ast::Ast;

use crate::error::{fail, fail_err, ByteResult, DecodeError};
use crate::{leb128_usize, parse_list};

const TAG_NIL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_NUMBER: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_GLOBAL: u8 = 4;
const TAG_HASH_TABLE: u8 = 5;

/// Parse one constant-pool entry and promote it to an expression.
///
/// `constants` holds the entries already promoted for this prototype:
/// `Global` entries reference prior string constants by pool index.
/// `HashTable` entries are import metadata; their content is consumed and a
/// `nil` placeholder keeps the pool indices aligned.
pub(crate) fn parse_constant<'a>(
    input: &'a [u8],
    strings: &[Vec<u8>],
    constants: &[ExprId],
    ast: &mut Ast,
    flagged: &mut bool,
) -> ByteResult<'a, ExprId> {
    let location = Location::default();
    let (input, tag) = le_u8(input)?;
    match tag {
        TAG_NIL => {
            // the producing compiler never pools nil; unfamiliar input
            *flagged = true;
            Ok((input, ast.exprs.alloc(Expr::Nil, location)))
        }
        TAG_BOOLEAN => {
            *flagged = true;
            let (input, value) = le_u8(input)?;
            Ok((input, ast.exprs.alloc(Expr::Bool(value != 0), location)))
        }
        TAG_NUMBER => {
            let (input, value) = le_f64(input)?;
            Ok((input, ast.exprs.alloc(Expr::Number(value), location)))
        }
        TAG_STRING => {
            let (rest, index) = leb128_usize(input)?;
            if index == 0 || index > strings.len() {
                return fail(input, format!("string constant index {} out of range", index));
            }
            let bytes = strings[index - 1].clone();
            Ok((rest, ast.exprs.alloc(Expr::String(bytes), location)))
        }
        TAG_GLOBAL => {
            let (rest, encoded) = le_u32(input)?;
            let expr = promote_global(input, encoded, constants, ast)?;
            Ok((rest, expr))
        }
        TAG_HASH_TABLE => {
            let (rest, _keys) = parse_list(input, leb128_usize)?;
            Ok((rest, ast.exprs.alloc(Expr::Nil, location)))
        }
        _ => fail(input, format!("unknown constant tag {}", tag)),
    }
}

/// Decode a packed global path: a 2-bit length in the top bits and up to
/// three 10-bit indices into prior string constants, yielding `A`, `A.B`,
/// or `A.B.C`.
fn promote_global<'a>(
    input: &'a [u8],
    encoded: u32,
    constants: &[ExprId],
    ast: &mut Ast,
) -> Result<ExprId, nom::Err<DecodeError<'a>>> {
    let count = encoded >> 30;
    if count == 0 {
        return Err(fail_err(input, "global constant with empty path"));
    }

    let location = Location::default();
    let first = constant_name(input, (encoded >> 20) & 0x3FF, constants, ast)?;
    let mut expr = ast.exprs.alloc(Expr::Global(first), location);

    if count > 1 {
        let index = constant_name(input, (encoded >> 10) & 0x3FF, constants, ast)?;
        expr = ast.exprs.alloc(Expr::IndexName { expr, index }, location);
    }
    if count > 2 {
        let index = constant_name(input, encoded & 0x3FF, constants, ast)?;
        expr = ast.exprs.alloc(Expr::IndexName { expr, index }, location);
    }

    Ok(expr)
}

fn constant_name<'a>(
    input: &'a [u8],
    pool_index: u32,
    constants: &[ExprId],
    ast: &mut Ast,
) -> Result<NameId, nom::Err<DecodeError<'a>>> {
    let Some(&id) = constants.get(pool_index as usize) else {
        return Err(fail_err(
            input,
            format!("global path constant {} out of range", pool_index),
        ));
    };
    let Expr::String(bytes) = ast.exprs.get(id) else {
        return Err(fail_err(
            input,
            format!("global path constant {} is not a string", pool_index),
        ));
    };
    let text = String::from_utf8_lossy(bytes).into_owned();
    Ok(ast.names.intern(&text))
}
