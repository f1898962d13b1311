use nom::number::complete::{le_u32, le_u8};
use rustc_hash::FxHashMap;

use ember_ast::arena::ExprId;
use ember_ast::Ast;

use crate::constant::parse_constant;
use crate::error::{fail, ByteResult};
use crate::instruction::Instruction;
use crate::opcode::{remap_table, OpCode};
use crate::{leb128_u32, leb128_usize, parse_list, parse_list_len, parse_string};

/// One compiled function body.
///
/// Fields follow serialization order. `constants` are already promoted to
/// expressions in the job's arena; `children` index into the chunk's
/// prototype vector (children always precede their parent); `line_info`
/// holds one accumulated line per instruction slot, auxiliary slots
/// sharing their opcode's line.
#[derive(Debug, PartialEq)]
pub struct Proto {
    pub max_reg_count: u8,
    pub arg_count: u8,
    pub upval_count: u8,
    pub is_vararg: bool,
    pub code: Vec<Instruction>,
    pub constants: Vec<ExprId>,
    pub children: Vec<usize>,
    pub name: Option<String>,
    pub line_info: Vec<i32>,
    pub is_main: bool,
}

impl Proto {
    /// The source line for an instruction slot, zero when absent.
    pub fn line(&self, pc: usize) -> u32 {
        self.line_info.get(pc).copied().unwrap_or(0) as u32
    }
}

/// A parsed program: the shared string table's prototypes and the entry
/// prototype's index.
#[derive(Debug, PartialEq)]
pub struct Chunk {
    pub protos: Vec<Proto>,
    pub main: usize,
    /// Advisory conditions met while reading (pooled nil/boolean
    /// constants, negative line accumulation, nonzero trailer bytes).
    pub flagged: bool,
}

impl Chunk {
    pub fn main_proto(&self) -> &Proto {
        &self.protos[self.main]
    }

    pub(crate) fn parse<'a>(input: &'a [u8], ast: &mut Ast) -> ByteResult<'a, Self> {
        let remap = remap_table();
        let mut flagged = false;

        let (input, strings) = parse_list(input, parse_string)?;

        let (input, proto_count) = leb128_usize(input)?;
        let mut protos: Vec<Proto> = Vec::with_capacity(proto_count.min(input.len()));
        let mut input = input;
        for _ in 0..proto_count {
            let (rest, proto) =
                parse_proto(input, &strings, &protos, &remap, ast, &mut flagged)?;
            protos.push(proto);
            input = rest;
        }

        let (input, main) = leb128_usize(input)?;
        if main >= protos.len() {
            return fail(input, format!("main prototype index {} out of range", main));
        }
        protos[main].is_main = true;

        Ok((
            input,
            Chunk {
                protos,
                main,
                flagged,
            },
        ))
    }
}

fn parse_proto<'a>(
    input: &'a [u8],
    strings: &[Vec<u8>],
    loaded: &[Proto],
    remap: &FxHashMap<u8, OpCode>,
    ast: &mut Ast,
    flagged: &mut bool,
) -> ByteResult<'a, Proto> {
    let (input, max_reg_count) = le_u8(input)?;
    let (input, arg_count) = le_u8(input)?;
    let (input, upval_count) = le_u8(input)?;
    let (input, is_vararg) = le_u8(input)?;

    // Instruction stream: the count includes auxiliary slots.
    let (input, instr_count) = leb128_usize(input)?;
    let (input, words) = parse_list_len(input, le_u32, instr_count)?;
    let code = match Instruction::decode_all(&words, remap) {
        Ok(code) => code,
        Err((pc, byte)) => {
            return fail(
                input,
                format!("invalid opcode byte 0x{:02X} in slot {}", byte, pc),
            );
        }
    };

    let (input, const_count) = leb128_usize(input)?;
    let mut constants: Vec<ExprId> = Vec::with_capacity(const_count.min(input.len()));
    let mut input = input;
    for _ in 0..const_count {
        let (rest, id) = parse_constant(input, strings, &constants, ast, flagged)?;
        constants.push(id);
        input = rest;
    }

    let (input, closure_count) = leb128_usize(input)?;
    let mut children = Vec::with_capacity(closure_count.min(input.len()));
    let mut input = input;
    for _ in 0..closure_count {
        let (rest, child) = leb128_usize(input)?;
        if child >= loaded.len() {
            return fail(input, format!("child prototype index {} out of range", child));
        }
        children.push(child);
        input = rest;
    }

    let (input, name_index) = leb128_usize(input)?;
    let name = if name_index == 0 {
        None
    } else if name_index <= strings.len() {
        Some(String::from_utf8_lossy(&strings[name_index - 1]).into_owned())
    } else {
        return fail(input, format!("prototype name index {} out of range", name_index));
    };

    // Line table: signed deltas accumulated in wrapping 32-bit arithmetic.
    let (input, line_count) = leb128_usize(input)?;
    let mut line_info = Vec::with_capacity(line_count.min(input.len()));
    let mut last_line: i32 = 0;
    let mut input = input;
    for _ in 0..line_count {
        let (rest, delta) = leb128_u32(input)?;
        last_line = last_line.wrapping_add(delta as i32);
        line_info.push(last_line);
        input = rest;
    }
    if last_line < 0 {
        *flagged = true;
    }

    let (input, trailer) = le_u8(input)?;
    if trailer != 0 {
        *flagged = true;
    }

    Ok((
        input,
        Proto {
            max_reg_count,
            arg_count,
            upval_count,
            is_vararg: is_vararg != 0,
            code,
            constants,
            children,
            name,
            line_info,
            is_main: false,
        },
    ))
}
