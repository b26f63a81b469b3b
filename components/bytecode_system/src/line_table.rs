//! Line-table decoding.
//!
//! Each instruction has a signed byte holding the line delta from the
//! previous instruction. When a delta does not fit, or when too many
//! instructions have passed since the last absolute entry, the byte holds
//! [`ABS_LINE_INFO`] and the line is recorded in `abs_line_info` instead.
//! Decoding walks forward from the nearest absolute entry, so a lookup
//! costs at most one stride of deltas.

use crate::opcode::Opcode;
use crate::proto::Proto;
use std::collections::BTreeSet;

/// Marker in `line_info` for an instruction with an absolute line entry.
pub const ABS_LINE_INFO: i8 = -0x80;

/// Deltas with an absolute value at least this large need an absolute entry.
pub const LINE_DIFF_LIMIT: i32 = 0x80;

/// Default maximum number of instructions between absolute entries.
pub const MAX_INSTRUCTIONS_WITHOUT_ABS: usize = 128;

/// An absolute line checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsLineInfo {
    /// Instruction the checkpoint belongs to
    pub pc: usize,
    /// Its source line
    pub line: i32,
}

impl Proto {
    /// Line and pc to start decoding from for `pc`. A base pc of `None`
    /// means decoding starts before the first instruction.
    fn base_line(&self, pc: usize) -> (Option<usize>, i32) {
        let abs = &self.abs_line_info;
        match abs.first() {
            Some(first) if pc >= first.pc => {
                // a lower bound: every stride contains at least one entry
                let stride = self.line_stride.max(1);
                let mut i = (pc / stride).saturating_sub(1).min(abs.len() - 1);
                while i > 0 && abs[i].pc > pc {
                    i -= 1;
                }
                while i + 1 < abs.len() && pc >= abs[i + 1].pc {
                    i += 1;
                }
                (Some(abs[i].pc), abs[i].line)
            }
            _ => (None, self.line_defined),
        }
    }

    /// Source line of the instruction at `pc`, or `None` when the function
    /// carries no line information.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytecode_system::{Instruction, Opcode, ProtoBuilder};
    ///
    /// let mut builder = ProtoBuilder::new().lines(10, 20);
    /// builder.emit(Instruction::abc(Opcode::Move, 0, 1, 0), 11);
    /// builder.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 12);
    /// let proto = builder.build();
    /// assert_eq!(proto.line_for(1), Some(12));
    /// ```
    pub fn line_for(&self, pc: usize) -> Option<i32> {
        if self.line_info.is_empty() {
            return None;
        }
        let (base_pc, mut line) = self.base_line(pc);
        let start = base_pc.map_or(0, |b| b + 1);
        for &delta in self.line_info.get(start..=pc).unwrap_or(&[]) {
            debug_assert_ne!(delta, ABS_LINE_INFO);
            line += delta as i32;
        }
        Some(line)
    }

    /// Whether the source line differs between `old_pc` and `new_pc`.
    ///
    /// Nearby instructions are compared by summing deltas; anything else
    /// (including an absolute entry on the way) decodes both lines.
    pub fn line_changed(&self, old_pc: usize, new_pc: usize) -> bool {
        if self.line_info.is_empty() {
            return false;
        }
        if new_pc > old_pc && new_pc - old_pc < self.line_stride / 2 {
            let mut delta = 0i32;
            for pc in old_pc + 1..=new_pc {
                match self.line_info.get(pc) {
                    Some(&ABS_LINE_INFO) | None => break,
                    Some(&d) => {
                        delta += d as i32;
                        if pc == new_pc {
                            return delta != 0;
                        }
                    }
                }
            }
        }
        self.line_for(old_pc) != self.line_for(new_pc)
    }

    /// Every line that holds at least one instruction, or `None` without
    /// line information.
    ///
    /// The leading `VARARGPREP` of a vararg function is not user code: its
    /// line seeds the walk but is not reported.
    pub fn valid_lines(&self) -> Option<BTreeSet<i32>> {
        if self.line_info.is_empty() {
            return None;
        }
        let mut lines = BTreeSet::new();
        let mut current = self.line_defined;
        let mut start = 0;
        if self.is_vararg {
            debug_assert!(self.code.first().map(|i| i.opcode()) == Some(Opcode::VarArgPrep));
            current = self.next_line(current, 0);
            start = 1;
        }
        for pc in start..self.line_info.len() {
            current = self.next_line(current, pc);
            lines.insert(current);
        }
        Some(lines)
    }

    fn next_line(&self, current: i32, pc: usize) -> i32 {
        match self.line_info[pc] {
            ABS_LINE_INFO => self.line_for(pc).unwrap_or(current),
            delta => current + delta as i32,
        }
    }
}
