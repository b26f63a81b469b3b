//! Tests for line-table decoding against a naive decoder

use bytecode_system::{Instruction, Opcode, Proto, ProtoBuilder, ABS_LINE_INFO};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decode by summing deltas from the first instruction.
fn naive_line(proto: &Proto, pc: usize) -> i32 {
    let mut line = proto.line_defined;
    for i in 0..=pc {
        let delta = proto.line_info[i];
        if delta == ABS_LINE_INFO {
            line = proto
                .abs_line_info
                .iter()
                .find(|abs| abs.pc == i)
                .map(|abs| abs.line)
                .unwrap();
        } else {
            line += delta as i32;
        }
    }
    line
}

fn build(lines: &[i32], stride: usize, defined: i32) -> Proto {
    let mut builder = ProtoBuilder::new()
        .lines(defined, defined + 10_000)
        .with_line_stride(stride);
    for &line in lines {
        builder.emit(Instruction::abc(Opcode::Move, 0, 0, 0), line);
    }
    builder.build()
}

#[test]
fn test_three_hundred_instructions() {
    // line 10 at pc 0, climbing to line 55 at pc 299
    let lines: Vec<i32> = (0..300).map(|pc| 10 + (pc * 45) / 299).collect();
    assert_eq!(lines[0], 10);
    assert_eq!(lines[299], 55);
    let proto = build(&lines, 128, 1);

    assert_eq!(proto.line_for(150), Some(naive_line(&proto, 150)));
    assert_eq!(proto.line_for(150), Some(lines[150]));
    assert_eq!(proto.line_for(299), Some(55));
    assert!(proto.abs_line_info.len() >= 2);
}

#[test]
fn test_random_tables_match_naive_decoder() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let stride = rng.gen_range(1..40);
        let count = rng.gen_range(1..400);
        let mut line = rng.gen_range(0..50);
        let defined = line;
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            line = match rng.gen_range(0..10) {
                0 => rng.gen_range(1..2000),
                1 => (line - rng.gen_range(0..5)).max(1),
                _ => line + rng.gen_range(0..3),
            };
            lines.push(line);
        }
        let proto = build(&lines, stride, defined);
        for pc in 0..count {
            assert_eq!(proto.line_for(pc), Some(lines[pc]));
            assert_eq!(proto.line_for(pc), Some(naive_line(&proto, pc)));
        }
        for _ in 0..20 {
            let old = rng.gen_range(0..count);
            let new = rng.gen_range(0..count);
            assert_eq!(proto.line_changed(old, new), lines[old] != lines[new]);
        }
    }
}

#[test]
fn test_valid_lines_cover_all_instructions() {
    let lines = [4, 4, 7, 300, 301, 8];
    let proto = build(&lines, 128, 3);
    let valid: Vec<i32> = proto.valid_lines().unwrap().into_iter().collect();
    assert_eq!(valid, vec![4, 7, 8, 300, 301]);
}
