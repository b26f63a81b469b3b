//! Symbolic name resolver tests

use bytecode_system::{Instruction, Opcode, Proto, ProtoBuilder, TagMethod};
use core_types::Value;
use debug_engine::{describe, find_set_reg, func_name_from_code, NameKind, VarName};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn name(kind: NameKind, name: &str) -> Option<VarName> {
    Some(VarName::new(kind, name))
}

/// 50 instructions; register 0 holds local `count` over [12, 40) and is
/// loaded from global `total` at pc 41.
fn counter_function() -> Proto {
    let mut b = ProtoBuilder::new();
    b.add_upvalue(Some("_ENV"), true, 0);
    let total = b.add_constant(Value::from("total"));
    for pc in 0..50 {
        let instruction = match pc {
            11 => Instruction::asbx(Opcode::LoadI, 0, 0),
            41 => Instruction::abc(Opcode::GetTabUp, 0, 0, total as u8),
            _ => Instruction::abc(Opcode::Move, 3, 2, 0),
        };
        b.emit(instruction, 1 + pc as i32 / 4);
    }
    b.add_local("count", 12, 40);
    b.build()
}

#[test]
fn test_local_live_range_then_symbolic() {
    let proto = counter_function();
    assert_eq!(describe(&proto, 25, 0), name(NameKind::Local, "count"));
    assert_eq!(describe(&proto, 45, 0), name(NameKind::Global, "total"));
    // after the loop ends, before the reload: LOADI gives no name
    assert_eq!(describe(&proto, 40, 0), None);
}

#[test]
fn test_mm_follow_up_excludes_previous_instruction() {
    let mut b = ProtoBuilder::new();
    let k = b.add_constant(Value::from("a"));
    b.emit(Instruction::abx(Opcode::LoadK, 0, k as u32), 1);
    b.emit(Instruction::abc(Opcode::Add, 0, 1, 2), 1);
    b.emit(Instruction::abc(Opcode::MmBin, 1, 2, TagMethod::Add as u8), 1);
    b.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 1);
    let proto = b.build();
    // the ADD has not completed while its metamethod runs
    assert_eq!(find_set_reg(&proto, 2, 0), Some(0));
    assert_eq!(describe(&proto, 2, 0), name(NameKind::Constant, "a"));
    assert_eq!(find_set_reg(&proto, 3, 0), Some(1));
    assert_eq!(describe(&proto, 3, 0), None);
}

#[test]
fn test_load_nil_and_tforcall_ranges() {
    let mut b = ProtoBuilder::new();
    b.emit(Instruction::abc(Opcode::LoadNil, 2, 3, 0), 1);
    b.emit(Instruction::abc(Opcode::TForCall, 4, 0, 2), 1);
    b.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 1);
    let proto = b.build();
    assert_eq!(find_set_reg(&proto, 2, 1), None);
    assert_eq!(find_set_reg(&proto, 2, 2), Some(0));
    assert_eq!(find_set_reg(&proto, 2, 5), Some(0));
    assert_eq!(find_set_reg(&proto, 2, 6), Some(1));
    assert_eq!(find_set_reg(&proto, 2, 9), Some(1));
}

#[test]
fn test_table_key_names() {
    let mut b = ProtoBuilder::new();
    let key = b.add_constant(Value::from("size"));
    b.emit(Instruction::abc(Opcode::NewTable, 0, 0, 0), 1);
    b.emit(Instruction::abx(Opcode::LoadK, 1, key as u32), 1);
    b.emit(Instruction::abc(Opcode::GetTable, 2, 0, 1), 1);
    b.emit(Instruction::abc(Opcode::GetTable, 3, 0, 4), 1);
    b.emit(Instruction::abc(Opcode::GetI, 4, 0, 1), 1);
    b.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 1);
    b.add_local("obj", 1, 6);
    let proto = b.build();
    assert_eq!(describe(&proto, 5, 2), name(NameKind::Field, "size"));
    assert_eq!(describe(&proto, 5, 3), name(NameKind::Field, "?"));
    assert_eq!(describe(&proto, 5, 4), name(NameKind::Field, "integer index"));
}

#[test]
fn test_load_kx_constant() {
    let mut b = ProtoBuilder::new();
    let k = b.add_constant(Value::from("wide"));
    b.emit(Instruction::abx(Opcode::LoadKx, 0, 0), 1);
    b.emit(Instruction::ax(Opcode::ExtraArg, k as u32), 1);
    b.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 1);
    let proto = b.build();
    assert_eq!(describe(&proto, 2, 0), name(NameKind::Constant, "wide"));
}

#[test]
fn test_method_with_register_key() {
    let mut b = ProtoBuilder::new();
    let k = b.add_constant(Value::from("draw"));
    b.emit(Instruction::abx(Opcode::LoadK, 3, k as u32), 1);
    b.emit(Instruction::abck(Opcode::SelfOp, 1, 0, 3, false), 1);
    b.emit(Instruction::abc(Opcode::Call, 1, 2, 1), 1);
    let proto = b.build();
    assert_eq!(func_name_from_code(&proto, 2), name(NameKind::Method, "draw"));
}

#[test]
fn test_metamethod_events_from_code() {
    let cases = [
        (Instruction::abc(Opcode::GetField, 0, 1, 0), "index"),
        (Instruction::abc(Opcode::SetTabUp, 0, 1, 0), "newindex"),
        (Instruction::abc(Opcode::Unm, 0, 1, 0), "unm"),
        (Instruction::abc(Opcode::BNot, 0, 1, 0), "bnot"),
        (Instruction::abc(Opcode::Concat, 0, 2, 0), "concat"),
        (Instruction::abc(Opcode::Eq, 0, 1, 0), "eq"),
        (Instruction::abc(Opcode::GeI, 0, 1, 0), "le"),
        (Instruction::abc(Opcode::GtI, 0, 1, 0), "lt"),
        (Instruction::abc(Opcode::Close, 0, 0, 0), "close"),
        (Instruction::abc(Opcode::Return, 0, 1, 0), "close"),
        (Instruction::abc(Opcode::MmBinK, 0, 1, TagMethod::Shl as u8), "shl"),
    ];
    for (instruction, expected) in cases {
        let mut b = ProtoBuilder::new();
        b.emit(instruction, 1);
        let proto = b.build();
        assert_eq!(
            func_name_from_code(&proto, 0),
            name(NameKind::Metamethod, expected),
            "{}",
            instruction
        );
    }
    let mut b = ProtoBuilder::new();
    b.emit(Instruction::abc(Opcode::EqI, 0, 1, 0), 1);
    assert_eq!(func_name_from_code(&b.build(), 0), None);
}

#[test]
fn test_out_of_range_pc() {
    let proto = counter_function();
    assert_eq!(func_name_from_code(&proto, 500), None);
    assert_eq!(find_set_reg(&proto, 500, 0), Some(41));
}

// ============================================================================
// Randomized soundness
// ============================================================================

/// A register written only inside a jumped-over block never gets a name.
#[test]
fn test_conditionally_set_register_is_unknown() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let mut b = ProtoBuilder::new();
        let k = b.add_constant(Value::from("suspect"));
        let target = rng.gen_range(0..4u8);
        let other = |rng: &mut StdRng| loop {
            let r = rng.gen_range(0..8u8);
            if r != target {
                break r;
            }
        };

        for _ in 0..rng.gen_range(0..6) {
            let r = other(&mut rng);
            b.emit(Instruction::abx(Opcode::LoadK, r, k as u32), 1);
        }
        let skipped = rng.gen_range(1..6);
        b.emit(Instruction::abck(Opcode::Test, 7, 0, 0, false), 1);
        b.emit(Instruction::sj(Opcode::Jmp, skipped as i32), 1);
        let set_at = rng.gen_range(0..skipped);
        for i in 0..skipped {
            let r = if i == set_at { target } else { other(&mut rng) };
            b.emit(Instruction::abx(Opcode::LoadK, r, k as u32), 2);
        }
        for _ in 0..rng.gen_range(0..6) {
            let r = other(&mut rng);
            b.emit(Instruction::abc(Opcode::Move, r, 7, 0), 3);
        }
        let query = b.emit(Instruction::abc(Opcode::Call, target, 1, 1), 4);
        let proto = b.build();

        assert_eq!(describe(&proto, query, target as usize), None);
        assert_eq!(func_name_from_code(&proto, query), None);
    }
}

/// Without jumps, the last load into a register names it.
#[test]
fn test_straight_line_last_load_wins() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let mut b = ProtoBuilder::new();
        let constants: Vec<usize> = (0..4)
            .map(|i| b.add_constant(Value::from(format!("k{}", i).as_str())))
            .collect();
        let mut last = [None; 4];
        for _ in 0..rng.gen_range(1..30) {
            let reg = rng.gen_range(0..4usize);
            let k = rng.gen_range(0..constants.len());
            b.emit(Instruction::abx(Opcode::LoadK, reg as u8, constants[k] as u32), 1);
            last[reg] = Some(k);
        }
        let query = b.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 1);
        let proto = b.build();
        for (reg, loaded) in last.iter().enumerate() {
            let expected = loaded.map(|k| VarName::new(NameKind::Constant, format!("k{}", k)));
            assert_eq!(describe(&proto, query, reg), expected);
        }
    }
}
