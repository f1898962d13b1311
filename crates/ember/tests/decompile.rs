mod common;

use common::{ChunkBuilder, ProtoBuilder};
use ember::{DecompileError, ReadError};
use ember_bytecode::opcode::OpCode;
use ember_emit::FLAG_PREAMBLE;

#[test]
fn compile_error_status_carries_the_message() {
    let mut bytes = vec![0u8];
    bytes.extend_from_slice(b"compile error: x");
    assert_eq!(
        ember::decompile(&bytes),
        Err(DecompileError::Read(ReadError::Rejected(
            "compile error: x".to_string()
        )))
    );
}

#[test]
fn unknown_status_is_a_version_mismatch() {
    assert_eq!(
        ember::decompile(&[2u8]),
        Err(DecompileError::Read(ReadError::Version(2)))
    );
}

#[test]
fn returning_a_pooled_constant() {
    let mut proto = ProtoBuilder::new();
    proto
        .op_d(OpCode::LoadConst, 0, 0)
        .op(OpCode::Return, 0, 2, 0)
        .const_number(42.0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "return 42\n");
}

#[test]
fn multiple_return_values_collapse() {
    let mut proto = ProtoBuilder::new();
    proto
        .op(OpCode::LoadNil, 0, 0, 0)
        .op(OpCode::LoadBool, 1, 1, 0)
        .op(OpCode::Return, 0, 3, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "return nil, true\n");
}

#[test]
fn self_capturing_closure_becomes_a_local_function() {
    // child: return nil
    let mut child = ProtoBuilder::new();
    child.upvals = 1;
    child
        .op(OpCode::LoadNil, 0, 0, 0)
        .op(OpCode::Return, 0, 2, 0);

    // parent: a number binding, then a closure capturing its own slot
    let mut parent = ProtoBuilder::new();
    parent
        .op_d(OpCode::LoadShort, 1, 5)
        .op_d(OpCode::Closure, 0, 0)
        .op(OpCode::Move, 0, 0, 0)
        .op(OpCode::Return, 0, 1, 0)
        .child(0);

    let bytes = ChunkBuilder::new().proto(child).proto(parent).main(1).build();
    assert_eq!(
        ember::decompile(&bytes).unwrap(),
        "local var0 = 5\nlocal function var1()\n    return nil\nend\n"
    );
}

#[test]
fn test_opcode_wraps_the_region_in_a_conditional() {
    let mut proto = ProtoBuilder::new();
    proto.args = 1;
    proto
        .op_d(OpCode::Test, 0, 2)
        .op(OpCode::LoadNil, 1, 0, 0)
        .op(OpCode::LoadNil, 2, 0, 0)
        .op(OpCode::Return, 0, 1, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert_eq!(
        ember::decompile(&bytes).unwrap(),
        "if not a0 then\n    local var0\n    local var1\nend\n"
    );
}

#[test]
fn global_call_with_inlined_operands() {
    let mut proto = ProtoBuilder::new();
    proto
        .op(OpCode::GetGlobal, 0, 0, 0)
        .aux(0)
        .op_d(OpCode::LoadShort, 1, 7)
        .op(OpCode::Call, 0, 2, 1)
        .op(OpCode::Return, 0, 1, 0)
        .const_string(1);

    let bytes = ChunkBuilder::new()
        .string("print")
        .proto(proto)
        .main(0)
        .build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "print(7)\n");
}

#[test]
fn method_calls_print_with_colon_sugar() {
    let mut proto = ProtoBuilder::new();
    proto
        .op(OpCode::GetGlobal, 0, 0, 0)
        .aux(0)
        .op(OpCode::Self_, 0, 0, 0)
        .aux(1)
        .op(OpCode::Call, 0, 2, 1)
        .op(OpCode::Return, 0, 1, 0)
        .const_string(1)
        .const_string(2);

    let bytes = ChunkBuilder::new()
        .string("obj")
        .string("foo")
        .proto(proto)
        .main(0)
        .build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "obj:foo()\n");
}

#[test]
fn conditional_loop_region_becomes_a_while() {
    let mut proto = ProtoBuilder::new();
    proto
        .op(OpCode::LoadBool, 0, 1, 0)
        .op_d(OpCode::Test, 0, 2)
        .op(OpCode::LoadNil, 1, 0, 0)
        .op_d(OpCode::LoopJump, 0, -2)
        .op(OpCode::Return, 0, 1, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    // the single-use condition binding folds into the loop header
    assert_eq!(
        ember::decompile(&bytes).unwrap(),
        "while true do\n    local var1\nend\n"
    );
}

#[test]
fn empty_chunk_is_rejected() {
    let bytes = ChunkBuilder::new().build();
    assert!(matches!(
        ember::decompile(&bytes),
        Err(DecompileError::Read(ReadError::Malformed { .. }))
    ));
}

#[test]
fn truncated_input_reports_its_offset() {
    let mut proto = ProtoBuilder::new();
    proto.op(OpCode::LoadNil, 0, 0, 0);
    let mut bytes = ChunkBuilder::new().proto(proto).main(0).build();
    bytes.truncate(6);

    match ember::decompile(&bytes) {
        Err(DecompileError::Read(ReadError::Malformed { offset, .. })) => {
            assert!(offset <= bytes.len());
        }
        other => panic!("expected malformed error, got {:?}", other),
    }
}

#[test]
fn prototype_with_no_instructions_prints_an_empty_block() {
    let proto = ProtoBuilder::new();
    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert_eq!(ember::decompile(&bytes).unwrap(), " ");
}

#[test]
fn studio_prototypes_are_read_unpermuted() {
    let mut proto = ProtoBuilder::new();
    proto
        .raw_op(OpCode::ClearStackFull, 0, 0, 0)
        .raw_op(OpCode::LoadNil, 0, 0, 0)
        .raw_op(OpCode::Return, 0, 2, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "return nil\n");
}

#[test]
fn unknown_padding_raises_the_flag() {
    let mut proto = ProtoBuilder::new();
    proto.op(OpCode::Nop, 0, 0, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    let text = ember::decompile(&bytes).unwrap();
    assert!(text.starts_with(FLAG_PREAMBLE));
}

#[test]
fn pooled_nil_constants_raise_the_flag() {
    let mut proto = ProtoBuilder::new();
    proto
        .op_d(OpCode::LoadConst, 0, 0)
        .op(OpCode::Return, 0, 2, 0)
        .const_nil();

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    let text = ember::decompile(&bytes).unwrap();
    assert!(text.starts_with(FLAG_PREAMBLE));
    assert!(text.ends_with("return nil\n"));
}

#[test]
fn dotted_global_paths_reconstruct() {
    let mut proto = ProtoBuilder::new();
    proto
        .op_d(OpCode::GetGlobalConst, 0, 2)
        .aux(0)
        .op(OpCode::Return, 0, 2, 0)
        .const_string(1)
        .const_string(2)
        .const_global(&[0, 1]);

    let bytes = ChunkBuilder::new()
        .string("game")
        .string("Workspace")
        .proto(proto)
        .main(0)
        .build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "return game.Workspace\n");
}

#[test]
fn arithmetic_chains_rebuild_infix_form() {
    let mut proto = ProtoBuilder::new();
    proto.args = 2;
    proto
        .op(OpCode::Add, 2, 0, 1)
        .op(OpCode::Return, 2, 2, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "return a0 + a1\n");
}

#[test]
fn vararg_tail_feeds_the_return() {
    let mut proto = ProtoBuilder::new();
    proto.vararg = true;
    proto
        .op(OpCode::LoadVarargs, 0, 0, 0)
        .op(OpCode::Return, 0, 0, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert_eq!(ember::decompile(&bytes).unwrap(), "return ...\n");
}

#[test]
fn return_tail_without_a_producer_fails() {
    let mut proto = ProtoBuilder::new();
    proto.op(OpCode::Return, 0, 0, 0);

    let bytes = ChunkBuilder::new().proto(proto).main(0).build();
    assert!(matches!(
        ember::decompile(&bytes),
        Err(DecompileError::Lift(_))
    ));
}
