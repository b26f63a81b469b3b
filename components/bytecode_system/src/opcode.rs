//! Opcodes of the register machine and their static properties.
//!
//! Every opcode carries a mode byte, laid out as
//! `MM(7) | OT(6) | IT(5) | T(4) | A(3) | format(0..3)`:
//!
//! - MM: the instruction is the metamethod follow-up of the previous one
//! - OT: the instruction sets the stack top for the next one
//! - IT: the instruction uses the stack top set by the previous one
//! - T: the instruction is a test and the next one is a jump
//! - A: the instruction writes register A

/// Operand layout of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpMode {
    /// A, k, B, C
    IABC = 0,
    /// A, unsigned Bx
    IABx = 1,
    /// A, signed sBx
    IAsBx = 2,
    /// Ax
    IAx = 3,
    /// signed sJ
    IsJ = 4,
}

const fn mode(mm: u8, ot: u8, it: u8, t: u8, a: u8, format: OpMode) -> u8 {
    (mm << 7) | (ot << 6) | (it << 5) | (t << 4) | (a << 3) | format as u8
}

macro_rules! opcodes {
    ($($(#[doc = $doc:literal])* $variant:ident = $name:literal,
       ($mm:literal, $ot:literal, $it:literal, $t:literal, $a:literal, $format:ident);)*) => {
        /// Bytecode opcodes, numbered in encoding order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[doc = $doc])* $variant,)*
        }

        impl Opcode {
            /// All opcodes in encoding order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            const MODES: &'static [u8] = &[$(mode($mm, $ot, $it, $t, $a, OpMode::$format),)*];

            /// Mnemonic used in listings.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    /// R[A] := R[B]
    Move = "MOVE", (0, 0, 0, 0, 1, IABC);
    /// R[A] := sBx
    LoadI = "LOADI", (0, 0, 0, 0, 1, IAsBx);
    /// R[A] := (float)sBx
    LoadF = "LOADF", (0, 0, 0, 0, 1, IAsBx);
    /// R[A] := K[Bx]
    LoadK = "LOADK", (0, 0, 0, 0, 1, IABx);
    /// R[A] := K[extra arg]
    LoadKx = "LOADKX", (0, 0, 0, 0, 1, IABx);
    /// R[A] := false
    LoadFalse = "LOADFALSE", (0, 0, 0, 0, 1, IABC);
    /// R[A] := false; pc++
    LFalseSkip = "LFALSESKIP", (0, 0, 0, 0, 1, IABC);
    /// R[A] := true
    LoadTrue = "LOADTRUE", (0, 0, 0, 0, 1, IABC);
    /// R[A], R[A+1], ..., R[A+B] := nil
    LoadNil = "LOADNIL", (0, 0, 0, 0, 1, IABC);
    /// R[A] := UpValue[B]
    GetUpval = "GETUPVAL", (0, 0, 0, 0, 1, IABC);
    /// UpValue[B] := R[A]
    SetUpval = "SETUPVAL", (0, 0, 0, 0, 0, IABC);
    /// R[A] := UpValue[B][K[C]:string]
    GetTabUp = "GETTABUP", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B][R[C]]
    GetTable = "GETTABLE", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B][C]
    GetI = "GETI", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B][K[C]:string]
    GetField = "GETFIELD", (0, 0, 0, 0, 1, IABC);
    /// UpValue[A][K[B]:string] := RK(C)
    SetTabUp = "SETTABUP", (0, 0, 0, 0, 0, IABC);
    /// R[A][R[B]] := RK(C)
    SetTable = "SETTABLE", (0, 0, 0, 0, 0, IABC);
    /// R[A][B] := RK(C)
    SetI = "SETI", (0, 0, 0, 0, 0, IABC);
    /// R[A][K[B]:string] := RK(C)
    SetField = "SETFIELD", (0, 0, 0, 0, 0, IABC);
    /// R[A] := {}
    NewTable = "NEWTABLE", (0, 0, 0, 0, 1, IABC);
    /// R[A+1] := R[B]; R[A] := R[B][RK(C):string]
    SelfOp = "SELF", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] + sC
    AddI = "ADDI", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] + K[C]:number
    AddK = "ADDK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] - K[C]:number
    SubK = "SUBK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] * K[C]:number
    MulK = "MULK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] % K[C]:number
    ModK = "MODK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] ^ K[C]:number
    PowK = "POWK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] / K[C]:number
    DivK = "DIVK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] // K[C]:number
    IDivK = "IDIVK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] & K[C]:integer
    BAndK = "BANDK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] | K[C]:integer
    BOrK = "BORK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] ~ K[C]:integer
    BXorK = "BXORK", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] >> sC
    ShrI = "SHRI", (0, 0, 0, 0, 1, IABC);
    /// R[A] := sC << R[B]
    ShlI = "SHLI", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] + R[C]
    Add = "ADD", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] - R[C]
    Sub = "SUB", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] * R[C]
    Mul = "MUL", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] % R[C]
    Mod = "MOD", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] ^ R[C]
    Pow = "POW", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] / R[C]
    Div = "DIV", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] // R[C]
    IDiv = "IDIV", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] & R[C]
    BAnd = "BAND", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] | R[C]
    BOr = "BOR", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] ~ R[C]
    BXor = "BXOR", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] << R[C]
    Shl = "SHL", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[B] >> R[C]
    Shr = "SHR", (0, 0, 0, 0, 1, IABC);
    /// call C metamethod over R[A] and R[B]
    MmBin = "MMBIN", (1, 0, 0, 0, 0, IABC);
    /// call C metamethod over R[A] and sB
    MmBinI = "MMBINI", (1, 0, 0, 0, 0, IABC);
    /// call C metamethod over R[A] and K[B]
    MmBinK = "MMBINK", (1, 0, 0, 0, 0, IABC);
    /// R[A] := -R[B]
    Unm = "UNM", (0, 0, 0, 0, 1, IABC);
    /// R[A] := ~R[B]
    BNot = "BNOT", (0, 0, 0, 0, 1, IABC);
    /// R[A] := not R[B]
    Not = "NOT", (0, 0, 0, 0, 1, IABC);
    /// R[A] := #R[B] (length operator)
    Len = "LEN", (0, 0, 0, 0, 1, IABC);
    /// R[A] := R[A].. ... ..R[A + B - 1]
    Concat = "CONCAT", (0, 0, 0, 0, 1, IABC);
    /// close all upvalues >= R[A]
    Close = "CLOSE", (0, 0, 0, 0, 0, IABC);
    /// mark variable A "to be closed"
    Tbc = "TBC", (0, 0, 0, 0, 0, IABC);
    /// pc += sJ
    Jmp = "JMP", (0, 0, 0, 0, 0, IsJ);
    /// if ((R[A] == R[B]) ~= k) then pc++
    Eq = "EQ", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] <  R[B]) ~= k) then pc++
    Lt = "LT", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] <= R[B]) ~= k) then pc++
    Le = "LE", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] == K[B]) ~= k) then pc++
    EqK = "EQK", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] == sB) ~= k) then pc++
    EqI = "EQI", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] < sB) ~= k) then pc++
    LtI = "LTI", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] <= sB) ~= k) then pc++
    LeI = "LEI", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] > sB) ~= k) then pc++
    GtI = "GTI", (0, 0, 0, 1, 0, IABC);
    /// if ((R[A] >= sB) ~= k) then pc++
    GeI = "GEI", (0, 0, 0, 1, 0, IABC);
    /// if (not R[A] == k) then pc++
    Test = "TEST", (0, 0, 0, 1, 0, IABC);
    /// if (not R[B] == k) then pc++ else R[A] := R[B]
    TestSet = "TESTSET", (0, 0, 0, 1, 1, IABC);
    /// R[A], ... ,R[A+C-2] := R[A](R[A+1], ... ,R[A+B-1])
    Call = "CALL", (0, 1, 1, 0, 1, IABC);
    /// return R[A](R[A+1], ... ,R[A+B-1])
    TailCall = "TAILCALL", (0, 1, 1, 0, 1, IABC);
    /// return R[A], ... ,R[A+B-2]
    Return = "RETURN", (0, 0, 1, 0, 0, IABC);
    /// return
    Return0 = "RETURN0", (0, 0, 0, 0, 0, IABC);
    /// return R[A]
    Return1 = "RETURN1", (0, 0, 0, 0, 0, IABC);
    /// update counters; if loop continues then pc-=Bx
    ForLoop = "FORLOOP", (0, 0, 0, 0, 1, IABx);
    /// check values and prepare counters; if not to run then pc+=Bx+1
    ForPrep = "FORPREP", (0, 0, 0, 0, 1, IABx);
    /// create upvalue for R[A + 3]; pc+=Bx
    TForPrep = "TFORPREP", (0, 0, 0, 0, 0, IABx);
    /// R[A+4], ... ,R[A+3+C] := R[A](R[A+1], R[A+2])
    TForCall = "TFORCALL", (0, 0, 0, 0, 0, IABC);
    /// if R[A+2] ~= nil then { R[A]=R[A+2]; pc -= Bx }
    TForLoop = "TFORLOOP", (0, 0, 0, 0, 1, IABx);
    /// R[A][C+i] := R[A+i], 1 <= i <= B
    SetList = "SETLIST", (0, 0, 1, 0, 0, IABC);
    /// R[A] := closure(KPROTO[Bx])
    Closure = "CLOSURE", (0, 0, 0, 0, 1, IABx);
    /// R[A], R[A+1], ..., R[A+C-2] = vararg
    VarArg = "VARARG", (0, 1, 0, 0, 1, IABC);
    /// adjust vararg parameters
    VarArgPrep = "VARARGPREP", (0, 0, 1, 0, 1, IABC);
    /// extra (larger) argument for previous opcode
    ExtraArg = "EXTRAARG", (0, 0, 0, 0, 0, IAx);
}

/// Number of opcodes.
pub const NUM_OPCODES: usize = Opcode::ALL.len();

impl Opcode {
    /// Decode an opcode number.
    pub fn from_u8(byte: u8) -> Option<Opcode> {
        Self::ALL.get(byte as usize).copied()
    }

    fn mode_byte(self) -> u8 {
        Self::MODES[self as usize]
    }

    /// Operand layout.
    pub fn mode(self) -> OpMode {
        match self.mode_byte() & 7 {
            0 => OpMode::IABC,
            1 => OpMode::IABx,
            2 => OpMode::IAsBx,
            3 => OpMode::IAx,
            _ => OpMode::IsJ,
        }
    }

    /// The instruction writes register A.
    pub fn sets_a(self) -> bool {
        self.mode_byte() & (1 << 3) != 0
    }

    /// The instruction is a test; the next instruction is a jump.
    pub fn is_test(self) -> bool {
        self.mode_byte() & (1 << 4) != 0
    }

    /// The instruction may use the top set by the previous instruction.
    pub fn uses_top(self) -> bool {
        self.mode_byte() & (1 << 5) != 0
    }

    /// The instruction may set the top for the next instruction.
    pub fn sets_top(self) -> bool {
        self.mode_byte() & (1 << 6) != 0
    }

    /// The instruction calls a metamethod on behalf of the previous one.
    pub fn is_mm_follow_up(self) -> bool {
        self.mode_byte() & (1 << 7) != 0
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
