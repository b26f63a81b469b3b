//! Fixed-width instruction encoding.
//!
//! ```text
//!  31       24 23      16  15  14        7 6      0
//! |     C     |    B     | k |     A     |   op   |   iABC
//! |          Bx (17 bits)    |     A     |   op   |   iABx / iAsBx
//! |              Ax / sJ (25 bits)       |   op   |   iAx / isJ
//! ```

use crate::opcode::{OpMode, Opcode};
use std::fmt;

const POS_A: u32 = 7;
const POS_K: u32 = 15;
const POS_B: u32 = 16;
const POS_C: u32 = 24;
const POS_BX: u32 = 15;
const POS_AX: u32 = 7;

/// Largest value of the 8-bit arguments A, B and C.
pub const MAXARG_ABC: u32 = 0xFF;
/// Largest value of Bx.
pub const MAXARG_BX: u32 = (1 << 17) - 1;
/// Largest value of Ax and of the raw sJ field.
pub const MAXARG_AX: u32 = (1 << 25) - 1;
/// Excess-K bias of sBx.
pub const OFFSET_SBX: i32 = (MAXARG_BX >> 1) as i32;
/// Excess-K bias of sJ.
pub const OFFSET_SJ: i32 = (MAXARG_AX >> 1) as i32;
/// Excess-K bias of the signed sB and sC arguments.
pub const OFFSET_SC: i32 = (MAXARG_ABC >> 1) as i32;

/// One encoded instruction.
///
/// # Examples
///
/// ```
/// use bytecode_system::{Instruction, Opcode};
///
/// let i = Instruction::abc(Opcode::Move, 1, 0, 0);
/// assert_eq!(i.opcode(), Opcode::Move);
/// assert_eq!(i.a(), 1);
/// assert_eq!(i.to_string(), "MOVE 1 0 0");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(u32);

impl Instruction {
    /// Encode an iABC instruction with k unset.
    pub fn abc(op: Opcode, a: u8, b: u8, c: u8) -> Self {
        Self::abck(op, a, b, c, false)
    }

    /// Encode an iABC instruction.
    pub fn abck(op: Opcode, a: u8, b: u8, c: u8, k: bool) -> Self {
        Instruction(
            op as u32
                | (a as u32) << POS_A
                | (k as u32) << POS_K
                | (b as u32) << POS_B
                | (c as u32) << POS_C,
        )
    }

    /// Encode an iABx instruction. `bx` is truncated to 17 bits.
    pub fn abx(op: Opcode, a: u8, bx: u32) -> Self {
        debug_assert!(bx <= MAXARG_BX);
        Instruction(op as u32 | (a as u32) << POS_A | (bx & MAXARG_BX) << POS_BX)
    }

    /// Encode an iAsBx instruction.
    pub fn asbx(op: Opcode, a: u8, sbx: i32) -> Self {
        Self::abx(op, a, (sbx + OFFSET_SBX) as u32)
    }

    /// Encode an iAx instruction. `ax` is truncated to 25 bits.
    pub fn ax(op: Opcode, ax: u32) -> Self {
        debug_assert!(ax <= MAXARG_AX);
        Instruction(op as u32 | (ax & MAXARG_AX) << POS_AX)
    }

    /// Encode an isJ instruction.
    pub fn sj(op: Opcode, sj: i32) -> Self {
        Self::ax(op, (sj + OFFSET_SJ) as u32)
    }

    /// Decode a raw word, rejecting unknown opcodes.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Opcode::from_u8((raw & 0x7F) as u8).map(|_| Instruction(raw))
    }

    /// The raw word.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// The opcode.
    pub fn opcode(self) -> Opcode {
        // construction only ever stores valid opcode numbers
        Opcode::ALL[(self.0 & 0x7F) as usize % Opcode::ALL.len()]
    }

    /// Argument A.
    pub fn a(self) -> usize {
        ((self.0 >> POS_A) & MAXARG_ABC) as usize
    }

    /// Argument B.
    pub fn b(self) -> usize {
        ((self.0 >> POS_B) & MAXARG_ABC) as usize
    }

    /// Argument C.
    pub fn c(self) -> usize {
        ((self.0 >> POS_C) & MAXARG_ABC) as usize
    }

    /// B read as a signed immediate.
    pub fn sb(self) -> i32 {
        self.b() as i32 - OFFSET_SC
    }

    /// C read as a signed immediate.
    pub fn sc(self) -> i32 {
        self.c() as i32 - OFFSET_SC
    }

    /// The k flag.
    pub fn k(self) -> bool {
        (self.0 >> POS_K) & 1 != 0
    }

    /// Argument Bx.
    pub fn bx(self) -> usize {
        ((self.0 >> POS_BX) & MAXARG_BX) as usize
    }

    /// Argument sBx.
    pub fn sbx(self) -> i32 {
        self.bx() as i32 - OFFSET_SBX
    }

    /// Argument Ax.
    pub fn ax_arg(self) -> u32 {
        (self.0 >> POS_AX) & MAXARG_AX
    }

    /// Argument sJ.
    pub fn sj_arg(self) -> i32 {
        self.ax_arg() as i32 - OFFSET_SJ
    }

    /// The instruction consumes an open result range left by the previous
    /// one (e.g. `CALL` with B = 0), so the stack top is meaningful.
    pub fn uses_open_top(self) -> bool {
        self.opcode().uses_top() && self.b() == 0
    }

    /// The instruction leaves an open result range for the next one.
    pub fn sets_open_top(self) -> bool {
        let op = self.opcode();
        (op.sets_top() && self.c() == 0) || op == Opcode::TailCall
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instruction({:#010x}: {})", self.0, self)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        match op.mode() {
            OpMode::IABC => {
                write!(f, "{} {} {} {}", op, self.a(), self.b(), self.c())?;
                if self.k() {
                    f.write_str("k")?;
                }
                Ok(())
            }
            OpMode::IABx => write!(f, "{} {} {}", op, self.a(), self.bx()),
            OpMode::IAsBx => write!(f, "{} {} {}", op, self.a(), self.sbx()),
            OpMode::IAx => write!(f, "{} {}", op, self.ax_arg()),
            OpMode::IsJ => write!(f, "{} {}", op, self.sj_arg()),
        }
    }
}
