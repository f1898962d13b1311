use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use ember_ast::arena::ExprId;
use ember_ast::expr::{BinOp, Expr, FuncExpr, UnOp};
use ember_ast::local::{Local, LocalId};
use ember_ast::name::NameId;
use ember_ast::pos::Location;
use ember_ast::stmt::{IfStmt, Stmt};
use ember_ast::Ast;
use ember_bytecode::opcode::OpCode;
use ember_bytecode::{Chunk, Proto};

/// An asserted invariant failed while lifting: a register or upvalue the
/// stream never defined, a multi-value consumer with no pending tail, a
/// malformed vararg load, an out-of-range pool or jump index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lift failure: {0}")]
pub struct LiftError(pub String);

fn err(message: impl Into<String>) -> LiftError {
    LiftError(message.into())
}

/// Register file: sparse map from register index to its current local.
type Registers = FxHashMap<u16, LocalId>;

/// A pending `Test`/`NotTest` conditional region.
struct Frame {
    code_start: usize,
    body_start: usize,
    code_end: i64,
    local: LocalId,
    /// `Test` enters its body when the register is falsy, so the printed
    /// condition is negated.
    negate: bool,
    location: Location,
}

pub(crate) struct Lifter<'a> {
    chunk: &'a Chunk,
    ast: &'a mut Ast,
    flagged: bool,
    /// Function nesting depth; each local records the depth it was
    /// introduced at so references can tell locals from upvalues.
    depth: u32,
}

impl<'a> Lifter<'a> {
    pub fn new(chunk: &'a Chunk, ast: &'a mut Ast) -> Self {
        Self {
            chunk,
            ast,
            flagged: false,
            depth: 0,
        }
    }

    pub fn flagged(&self) -> bool {
        self.flagged
    }

    fn flag(&mut self) {
        self.flagged = true;
    }

    /// The local bound at `reg`, creating (and flagging, at the caller's
    /// discretion) a fresh `var<N>` when the register is unknown.
    fn find_or_create(
        &mut self,
        regs: &mut Registers,
        location: Location,
        reg: u16,
    ) -> (LocalId, bool) {
        if let Some(&local) = regs.get(&reg) {
            (local, false)
        } else {
            let local = self.ast.fresh_synthetic(location, self.depth);
            regs.insert(reg, local);
            (local, true)
        }
    }

    /// Hard register lookup for sites where an unknown register is an
    /// invariant violation rather than missing information.
    fn read_reg(&self, regs: &Registers, reg: u16) -> Result<LocalId, LiftError> {
        regs.get(&reg)
            .copied()
            .ok_or_else(|| err(format!("no local bound at register {}", reg)))
    }

    fn local_expr(&mut self, local: LocalId, location: Location) -> ExprId {
        let upvalue = self.ast.locals.get(local).function_depth != self.depth;
        self.ast.exprs.alloc(Expr::Local { local, upvalue }, location)
    }

    /// Emit `local x = value` for a fresh register or `x = value` for a
    /// rebound one.
    fn bind_or_assign(
        &mut self,
        body: &mut Vec<Stmt>,
        location: Location,
        local: LocalId,
        created: bool,
        value: ExprId,
    ) {
        if created {
            body.push(Stmt::Local {
                vars: vec![local],
                values: vec![value],
            });
        } else {
            let target = self.local_expr(local, location);
            body.push(Stmt::Assign {
                targets: vec![target],
                values: vec![value],
            });
        }
    }

    fn constant(&self, proto: &Proto, index: usize) -> Result<ExprId, LiftError> {
        proto
            .constants
            .get(index)
            .copied()
            .ok_or_else(|| err(format!("constant index {} out of range", index)))
    }

    /// A constant that must be a string, interned as a name (global and
    /// method-field references).
    fn constant_name(&mut self, proto: &Proto, index: usize) -> Result<NameId, LiftError> {
        let id = self.constant(proto, index)?;
        let Expr::String(bytes) = self.ast.exprs.get(id) else {
            return Err(err(format!("constant {} is not a string", index)));
        };
        let text = String::from_utf8_lossy(bytes).into_owned();
        Ok(self.ast.names.intern(&text))
    }

    /// Lift one prototype. `upvalues` are the locals captured for it at
    /// its closure site (empty for the main prototype). Returns the
    /// argument locals and the optimized body.
    pub fn lift_proto(
        &mut self,
        proto_index: usize,
        upvalues: Vec<LocalId>,
    ) -> Result<(Vec<LocalId>, Vec<Stmt>), LiftError> {
        let chunk = self.chunk;
        let proto = chunk
            .protos
            .get(proto_index)
            .ok_or_else(|| err(format!("prototype index {} out of range", proto_index)))?;

        self.depth += 1;

        let mut regs: Registers = Registers::default();
        let mut args = Vec::with_capacity(proto.arg_count as usize);
        for arg_index in 0..proto.arg_count {
            let name = self.ast.names.intern(&format!("a{}", arg_index));
            let local = self.ast.locals.alloc(Local {
                name,
                location: Location::default(),
                shadow: None,
                function_depth: self.depth,
            });
            regs.insert(arg_index as u16, local);
            args.push(local);
        }

        let code = &proto.code;
        let mut body: Vec<Stmt> = Vec::new();
        let mut instr_body_map = vec![0usize; code.len()];
        // pending multi-value tail: (base register, expression)
        let mut tail: Option<(u16, ExprId)> = None;
        // pending method-call callee from Self
        let mut self_expr: Option<ExprId> = None;
        let mut frames: VecDeque<Frame> = VecDeque::new();

        let mut i = 0usize;
        while i < code.len() {
            instr_body_map[i] = body.len();
            let instr = code[i];
            let location = Location::at_line(proto.line(i));

            match instr.op {
                OpCode::Nop => self.flag(),
                OpCode::SaveCode | OpCode::SaveRegisters => {}
                OpCode::ClearStack | OpCode::ClearStackFull => {}

                OpCode::LoadNil => {
                    let (local, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let value = self.ast.exprs.alloc(Expr::Nil, location);
                    self.bind_or_assign(&mut body, location, local, created, value);
                }
                OpCode::LoadBool => {
                    let (local, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let value = self.ast.exprs.alloc(Expr::Bool(instr.b != 0), location);
                    self.bind_or_assign(&mut body, location, local, created, value);
                }
                OpCode::LoadShort => {
                    let (local, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let value = self
                        .ast
                        .exprs
                        .alloc(Expr::Number(instr.sbx() as f64), location);
                    self.bind_or_assign(&mut body, location, local, created, value);
                }
                OpCode::LoadConst => {
                    let (local, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let value = self.constant(proto, instr.bx() as usize)?;
                    self.bind_or_assign(&mut body, location, local, created, value);
                }
                OpCode::Move => {
                    let (to, to_created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let from = instr.b as u16;
                    let value = match tail {
                        Some((base, expr)) if from == base => {
                            tail = None;
                            expr
                        }
                        Some((base, _)) if from > base => self.ast.exprs.alloc(Expr::Nil, location),
                        _ => {
                            let (source, source_created) =
                                self.find_or_create(&mut regs, location, from);
                            if source_created {
                                self.flag();
                            }
                            self.local_expr(source, location)
                        }
                    };
                    self.bind_or_assign(&mut body, location, to, to_created, value);
                }

                OpCode::GetGlobal => {
                    let (local, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let name = self.constant_name(proto, instr.aux as usize)?;
                    let value = self.ast.exprs.alloc(Expr::Global(name), location);
                    self.bind_or_assign(&mut body, location, local, created, value);
                    skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                }
                OpCode::SetGlobal => {
                    let (local, _) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let value = self.local_expr(local, location);
                    let name = self.constant_name(proto, instr.aux as usize)?;
                    let target = self.ast.exprs.alloc(Expr::Global(name), location);
                    body.push(Stmt::Assign {
                        targets: vec![target],
                        values: vec![value],
                    });
                    skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                }
                OpCode::GetGlobalConst => {
                    let (local, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let value = self.constant(proto, instr.bx() as usize)?;
                    self.bind_or_assign(&mut body, location, local, created, value);
                    skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                }

                OpCode::GetUpvalue => {
                    let (result, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let upvalue = upvalue_at(&upvalues, instr.b)?;
                    let value = self.local_expr(upvalue, location);
                    self.bind_or_assign(&mut body, location, result, created, value);
                }
                OpCode::SetUpvalue => {
                    let (source, _) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let upvalue = upvalue_at(&upvalues, instr.b)?;
                    let value = self.local_expr(source, location);
                    let target = self.local_expr(upvalue, location);
                    body.push(Stmt::Assign {
                        targets: vec![target],
                        values: vec![value],
                    });
                }

                OpCode::GetTableIndex => {
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let (table, table_created) =
                        self.find_or_create(&mut regs, location, instr.b as u16);
                    let (index, index_created) =
                        self.find_or_create(&mut regs, location, instr.c as u16);
                    if table_created || index_created {
                        self.flag();
                    }
                    let table = self.local_expr(table, location);
                    let index = self.local_expr(index, location);
                    let value = self
                        .ast
                        .exprs
                        .alloc(Expr::IndexExpr { expr: table, index }, location);
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                }
                OpCode::SetTableIndex => {
                    let (source, _) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let (table, _) = self.find_or_create(&mut regs, location, instr.b as u16);
                    let (index, _) = self.find_or_create(&mut regs, location, instr.c as u16);
                    let value = self.local_expr(source, location);
                    let table = self.local_expr(table, location);
                    let index = self.local_expr(index, location);
                    let target = self
                        .ast
                        .exprs
                        .alloc(Expr::IndexExpr { expr: table, index }, location);
                    body.push(Stmt::Assign {
                        targets: vec![target],
                        values: vec![value],
                    });
                }
                OpCode::GetTableIndexConstant => {
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let (table, table_created) =
                        self.find_or_create(&mut regs, location, instr.b as u16);
                    if table_created {
                        self.flag();
                    }
                    let index = self.constant(proto, instr.aux as usize)?;
                    let table = self.local_expr(table, location);
                    let value = self
                        .ast
                        .exprs
                        .alloc(Expr::IndexExpr { expr: table, index }, location);
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                    skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                }
                OpCode::SetTableIndexConstant => {
                    let (source, _) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let (table, _) = self.find_or_create(&mut regs, location, instr.b as u16);
                    let value = self.local_expr(source, location);
                    let index = self.constant(proto, instr.aux as usize)?;
                    let table = self.local_expr(table, location);
                    let target = self
                        .ast
                        .exprs
                        .alloc(Expr::IndexExpr { expr: table, index }, location);
                    body.push(Stmt::Assign {
                        targets: vec![target],
                        values: vec![value],
                    });
                    skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                }
                OpCode::GetTableIndexByte => {
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let (table, table_created) =
                        self.find_or_create(&mut regs, location, instr.b as u16);
                    if table_created {
                        self.flag();
                    }
                    let table = self.local_expr(table, location);
                    let index = self
                        .ast
                        .exprs
                        .alloc(Expr::Number((instr.c as f64) + 1.0), location);
                    let value = self
                        .ast
                        .exprs
                        .alloc(Expr::IndexExpr { expr: table, index }, location);
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                }
                OpCode::SetTableIndexByte => {
                    let (source, _) = self.find_or_create(&mut regs, location, instr.a as u16);
                    let (table, _) = self.find_or_create(&mut regs, location, instr.b as u16);
                    let value = self.local_expr(source, location);
                    let table = self.local_expr(table, location);
                    let index = self
                        .ast
                        .exprs
                        .alloc(Expr::Number((instr.c as f64) + 1.0), location);
                    let target = self
                        .ast
                        .exprs
                        .alloc(Expr::IndexExpr { expr: table, index }, location);
                    body.push(Stmt::Assign {
                        targets: vec![target],
                        values: vec![value],
                    });
                }

                OpCode::Closure => {
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let child_index = *proto
                        .children
                        .get(instr.bx() as usize)
                        .ok_or_else(|| err(format!("child index {} out of range", instr.bx())))?;
                    let child = &chunk.protos[child_index];

                    // the next upvalCount instructions describe the captures
                    let mut captured = Vec::with_capacity(child.upval_count as usize);
                    let mut local_function = false;
                    for _ in 0..child.upval_count {
                        i += 1;
                        let capture = code
                            .get(i)
                            .copied()
                            .ok_or_else(|| err("truncated closure capture list"))?;
                        instr_body_map[i] = body.len();
                        match capture.op {
                            OpCode::Move => {
                                let (upvalue, created) =
                                    self.find_or_create(&mut regs, location, capture.b as u16);
                                if created {
                                    self.flag();
                                }
                                if upvalue == result {
                                    local_function = true;
                                }
                                captured.push(upvalue);
                            }
                            OpCode::GetUpvalue => {
                                captured.push(upvalue_at(&upvalues, capture.b)?);
                            }
                            _ => self.flag(),
                        }
                    }

                    let (child_args, child_body) = self.lift_proto(child_index, captured)?;
                    let value = self.ast.exprs.alloc(
                        Expr::Function(FuncExpr {
                            self_local: None,
                            args: child_args,
                            vararg: child.is_vararg,
                            body: child_body,
                        }),
                        location,
                    );

                    if local_function && result_created {
                        body.push(Stmt::LocalFunction {
                            var: result,
                            func: value,
                        });
                    } else {
                        self.bind_or_assign(&mut body, location, result, result_created, value);
                    }
                }

                OpCode::Self_ => {
                    // the result register is reserved even though no
                    // statement is emitted yet
                    let _ = self.find_or_create(&mut regs, location, instr.a as u16);
                    let (table, _) = self.find_or_create(&mut regs, location, instr.b as u16);
                    let index = self.constant_name(proto, instr.aux as usize)?;
                    let table = self.local_expr(table, location);
                    let callee = self
                        .ast
                        .exprs
                        .alloc(Expr::IndexName { expr: table, index }, location);
                    self_expr = Some(callee);
                    skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                }

                OpCode::Call => {
                    let base = instr.a as u16;
                    let method = self_expr.is_some();
                    let func = match self_expr.take() {
                        Some(callee) => callee,
                        None => {
                            let local = self.read_reg(&regs, base)?;
                            self.local_expr(local, location)
                        }
                    };
                    regs.remove(&base);

                    let self_offset = method as u16;
                    let mut call_args = Vec::new();
                    if instr.b != 0 {
                        for j in (1 + self_offset)..instr.b as u16 {
                            let local = self.read_reg(&regs, base + j)?;
                            call_args.push(self.local_expr(local, location));
                            regs.remove(&(base + j));
                        }
                    } else {
                        let (tail_base, tail_expr) = tail
                            .take()
                            .ok_or_else(|| err("call consumes a tail that was never produced"))?;
                        for reg in (base + 1 + self_offset)..tail_base {
                            let local = self.read_reg(&regs, reg)?;
                            call_args.push(self.local_expr(local, location));
                            regs.remove(&reg);
                        }
                        call_args.push(tail_expr);
                    }

                    let call = self.ast.exprs.alloc(
                        Expr::Call {
                            func,
                            args: call_args,
                            method,
                        },
                        location,
                    );

                    match instr.c {
                        0 => tail = Some((base, call)),
                        1 => body.push(Stmt::Expr(call)),
                        results => {
                            let mut vars = Vec::with_capacity(results as usize - 1);
                            for j in 0..(results as u16 - 1) {
                                let (local, _) = self.find_or_create(&mut regs, location, base + j);
                                vars.push(local);
                            }
                            body.push(Stmt::Local {
                                vars,
                                values: vec![call],
                            });
                        }
                    }
                }

                OpCode::Return => {
                    if instr.b == 1 && (proto.is_main || i == code.len() - 1) {
                        // implicit trailing return
                    } else {
                        let mut values = Vec::new();
                        if instr.b == 0 {
                            let (tail_base, tail_expr) = tail.take().ok_or_else(|| {
                                err("return consumes a tail that was never produced")
                            })?;
                            for reg in instr.a as u16..tail_base {
                                let local = self.read_reg(&regs, reg)?;
                                values.push(self.local_expr(local, location));
                                regs.remove(&reg);
                            }
                            values.push(tail_expr);
                        } else {
                            for j in 0..instr.b as u16 - 1 {
                                let reg = instr.a as u16 + j;
                                let local = self.read_reg(&regs, reg)?;
                                values.push(self.local_expr(local, location));
                                regs.remove(&reg);
                            }
                        }
                        body.push(Stmt::Return(values));
                    }
                }

                OpCode::LoopJump => {
                    let target = i as i64 + instr.sbx() as i64;
                    let mut body_start = *instr_body_map
                        .get(usize::try_from(target).map_err(|_| {
                            err(format!("loop jump target {} out of range", target))
                        })?)
                        .ok_or_else(|| err(format!("loop jump target {} out of range", target)))?;

                    let mut condition = self.ast.exprs.alloc(Expr::Bool(true), location);
                    if let Some(front) = frames.front() {
                        if front.code_end == i as i64 {
                            let frame = frames.pop_front().unwrap();
                            if frame.code_start == i.wrapping_sub(1) {
                                // repeat-shaped region; lowered as `while`
                                // until a faithful repeat emission exists
                                tracing::debug!(pc = i, "repeat-shaped loop");
                            }
                            condition = self.local_expr(frame.local, frame.location);
                            body_start = frame.body_start;
                        }
                    }

                    let mut inner = if body_start <= body.len() {
                        body.split_off(body_start)
                    } else {
                        Vec::new()
                    };
                    ember_exprs::optimize(self.ast, &mut inner, self.depth);
                    body.push(Stmt::While {
                        condition,
                        body: inner,
                    });
                }

                OpCode::Test | OpCode::NotTest => {
                    let (local, created) = self.find_or_create(&mut regs, location, instr.a as u16);
                    if created {
                        self.flag();
                    }
                    frames.push_back(Frame {
                        code_start: i,
                        body_start: body.len(),
                        code_end: i as i64 + instr.sbx() as i64,
                        local,
                        negate: instr.op == OpCode::Test,
                        location,
                    });
                }

                OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Mod
                | OpCode::Pow => {
                    let (left, left_created) =
                        self.find_or_create(&mut regs, location, instr.b as u16);
                    if left_created {
                        self.flag();
                    }
                    let (right, right_created) =
                        self.find_or_create(&mut regs, location, instr.c as u16);
                    if right_created {
                        self.flag();
                    }
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let left = self.local_expr(left, location);
                    let right = self.local_expr(right, location);
                    let value = self.ast.exprs.alloc(
                        Expr::Binary {
                            op: arith_op(instr.op),
                            left,
                            right,
                        },
                        location,
                    );
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                }
                OpCode::AddByte
                | OpCode::SubByte
                | OpCode::MulByte
                | OpCode::DivByte
                | OpCode::ModByte
                | OpCode::PowByte => {
                    let (left, left_created) =
                        self.find_or_create(&mut regs, location, instr.b as u16);
                    if left_created {
                        self.flag();
                    }
                    let right = self.constant(proto, instr.c as usize)?;
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let left = self.local_expr(left, location);
                    let value = self.ast.exprs.alloc(
                        Expr::Binary {
                            op: arith_op(instr.op),
                            left,
                            right,
                        },
                        location,
                    );
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                }

                OpCode::Concat => {
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let (start, start_created) =
                        self.find_or_create(&mut regs, location, instr.b as u16);
                    if start_created {
                        self.flag();
                    }
                    let mut value = self.local_expr(start, location);
                    for reg in (instr.b as u16 + 1)..=(instr.c as u16) {
                        let (operand, operand_created) =
                            self.find_or_create(&mut regs, location, reg);
                        if operand_created {
                            self.flag();
                        }
                        let right = self.local_expr(operand, location);
                        value = self.ast.exprs.alloc(
                            Expr::Binary {
                                op: BinOp::Concat,
                                left: value,
                                right,
                            },
                            location,
                        );
                    }
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                }

                OpCode::Not | OpCode::UnaryMinus | OpCode::Len => {
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let (operand, operand_created) =
                        self.find_or_create(&mut regs, location, instr.b as u16);
                    if operand_created {
                        self.flag();
                    }
                    let operand = self.local_expr(operand, location);
                    let value = self.ast.exprs.alloc(
                        Expr::Unary {
                            op: unary_op(instr.op),
                            expr: operand,
                        },
                        location,
                    );
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                }

                OpCode::NewTable | OpCode::NewTableConst => {
                    let (result, result_created) =
                        self.find_or_create(&mut regs, location, instr.a as u16);
                    let value = self
                        .ast
                        .exprs
                        .alloc(Expr::Table { items: Vec::new() }, location);
                    self.bind_or_assign(&mut body, location, result, result_created, value);
                    if instr.op == OpCode::NewTable {
                        skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                    }
                }

                OpCode::SetList => {
                    // positional initialization arrives as indexed stores
                    skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                }

                OpCode::LoadVarargs => {
                    let value = self.ast.exprs.alloc(Expr::Varargs, location);
                    if instr.b == 0 {
                        tail = Some((instr.a as u16, value));
                    } else {
                        let mut vars = Vec::with_capacity(instr.b as usize - 1);
                        let mut last_created = false;
                        for j in 0..instr.b as u16 - 1 {
                            let (local, created) =
                                self.find_or_create(&mut regs, location, instr.a as u16 + j);
                            if j != 0 && created != last_created {
                                return Err(err("malformed vararg load: mixed register state"));
                            }
                            vars.push(local);
                            last_created = created;
                        }
                        if !last_created {
                            return Err(err("malformed vararg load: registers already bound"));
                        }
                        body.push(Stmt::Local {
                            vars,
                            values: vec![value],
                        });
                    }
                }

                OpCode::Jump
                | OpCode::FarJump
                | OpCode::Or
                | OpCode::And
                | OpCode::OrByte
                | OpCode::AndByte
                | OpCode::ForPrep
                | OpCode::ForLoop
                | OpCode::TForLoop
                | OpCode::LoopJumpIPairs
                | OpCode::TForLoopIPairs
                | OpCode::LoopJumpNext
                | OpCode::TForLoopNext
                | OpCode::BuiltinCall
                | OpCode::LoadConstLarge
                | OpCode::Equal
                | OpCode::LesserOrEqual
                | OpCode::LesserThan
                | OpCode::NotEqual
                | OpCode::GreaterThan
                | OpCode::GreaterOrEqual => {
                    tracing::warn!(op = ?instr.op, pc = i, "unsupported opcode");
                    self.flag();
                    if instr.op.has_aux() {
                        skip_aux_slot(&mut instr_body_map, &mut i, body.len());
                    }
                }
            }

            // close a conditional region ending at this instruction
            if let Some(front) = frames.front() {
                if front.code_end == i as i64 {
                    let frame = frames.pop_front().unwrap();
                    let mut inner = if frame.body_start <= body.len() {
                        body.split_off(frame.body_start)
                    } else {
                        Vec::new()
                    };
                    ember_exprs::optimize(self.ast, &mut inner, self.depth);

                    let mut condition = self.local_expr(frame.local, frame.location);
                    if frame.negate {
                        condition = self.ast.exprs.alloc(
                            Expr::Unary {
                                op: UnOp::Not,
                                expr: condition,
                            },
                            frame.location,
                        );
                    }
                    body.push(Stmt::If(IfStmt {
                        condition,
                        then_body: inner,
                        else_body: None,
                    }));
                }
            }

            i += 1;
        }

        ember_exprs::optimize(self.ast, &mut body, self.depth);

        self.depth -= 1;
        Ok((args, body))
    }
}

fn upvalue_at(upvalues: &[LocalId], index: u8) -> Result<LocalId, LiftError> {
    upvalues
        .get(index as usize)
        .copied()
        .ok_or_else(|| err(format!("upvalue index {} out of range", index)))
}

fn skip_aux_slot(instr_body_map: &mut [usize], i: &mut usize, body_len: usize) {
    *i += 1;
    if let Some(slot) = instr_body_map.get_mut(*i) {
        *slot = body_len;
    }
}

fn arith_op(op: OpCode) -> BinOp {
    match op {
        OpCode::Add | OpCode::AddByte => BinOp::Add,
        OpCode::Sub | OpCode::SubByte => BinOp::Sub,
        OpCode::Mul | OpCode::MulByte => BinOp::Mul,
        OpCode::Div | OpCode::DivByte => BinOp::Div,
        OpCode::Mod | OpCode::ModByte => BinOp::Mod,
        OpCode::Pow | OpCode::PowByte => BinOp::Pow,
        _ => unreachable!("not an arithmetic opcode"),
    }
}

fn unary_op(op: OpCode) -> UnOp {
    match op {
        OpCode::Not => UnOp::Not,
        OpCode::UnaryMinus => UnOp::Minus,
        OpCode::Len => UnOp::Len,
        _ => unreachable!("not a unary opcode"),
    }
}
