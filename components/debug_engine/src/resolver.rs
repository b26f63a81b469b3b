//! Symbolic name resolution.
//!
//! Recovers a plausible name for the value in a register by scanning the
//! function's bytecode backwards from the point of use. The analysis is
//! deliberately conservative: any register set only on a conditional path
//! yields no name at all rather than a possibly wrong one.
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Instruction, Opcode, ProtoBuilder};
//! use debug_engine::{describe, NameKind};
//!
//! let mut builder = ProtoBuilder::new();
//! let print = builder.add_constant("print".into());
//! let env = builder.add_upvalue(Some("_ENV"), true, 0);
//! builder.emit(Instruction::abc(Opcode::GetTabUp, 0, env as u8, print as u8), 1);
//! builder.emit(Instruction::abc(Opcode::Call, 0, 1, 1), 1);
//! let proto = builder.build();
//!
//! let name = describe(&proto, 1, 0).unwrap();
//! assert_eq!(name.kind, NameKind::Global);
//! assert_eq!(name.name, "print");
//! ```

use crate::call_frame::{CallStatus, FrameId};
use crate::context::ThreadState;
use bytecode_system::{Instruction, Opcode, Proto, TagMethod};
use serde::Serialize;
use std::fmt;

/// Name of the implicit upvalue holding the global table.
pub const ENV_NAME: &str = "_ENV";

/// What kind of thing a recovered name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameKind {
    /// A declared local variable
    Local,
    /// A captured variable
    Upvalue,
    /// A string constant
    Constant,
    /// A field of the global table
    Global,
    /// A field of some other table
    Field,
    /// A method looked up through `SELF`
    Method,
    /// A metamethod invoked by the interpreter
    Metamethod,
    /// The iterator of a generic `for`
    #[serde(rename = "for iterator")]
    ForIterator,
    /// A function called by the hook machinery
    Hook,
}

impl NameKind {
    /// Display form, e.g. `"for iterator"`.
    pub fn as_str(self) -> &'static str {
        match self {
            NameKind::Local => "local",
            NameKind::Upvalue => "upvalue",
            NameKind::Constant => "constant",
            NameKind::Global => "global",
            NameKind::Field => "field",
            NameKind::Method => "method",
            NameKind::Metamethod => "metamethod",
            NameKind::ForIterator => "for iterator",
            NameKind::Hook => "hook",
        }
    }
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered name with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VarName {
    /// What the name refers to
    pub kind: NameKind,
    /// The name itself (`"?"` when the kind is known but the name is not)
    pub name: String,
}

impl VarName {
    /// Create a name of the given kind.
    pub fn new(kind: NameKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// Which registers an instruction may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterEffect {
    /// Writes `first..=last`
    Range { first: usize, last: usize },
    /// Writes every register from the given one upwards
    From(usize),
    /// Writes nothing but jumps to the given pc
    Jump(isize),
    /// Writes exactly one register
    Single(usize),
    /// Writes no register
    None,
}

impl RegisterEffect {
    fn of(pc: usize, instruction: Instruction) -> Self {
        let op = instruction.opcode();
        let a = instruction.a();
        match op {
            Opcode::LoadNil => RegisterEffect::Range {
                first: a,
                last: a + instruction.b(),
            },
            Opcode::TForCall => RegisterEffect::From(a + 2),
            Opcode::Call | Opcode::TailCall => RegisterEffect::From(a),
            Opcode::Jmp => RegisterEffect::Jump(pc as isize + 1 + instruction.sj_arg() as isize),
            _ if op.sets_a() => RegisterEffect::Single(a),
            _ => RegisterEffect::None,
        }
    }

    fn writes(self, reg: usize) -> bool {
        match self {
            RegisterEffect::Range { first, last } => first <= reg && reg <= last,
            RegisterEffect::From(first) => reg >= first,
            RegisterEffect::Single(a) => reg == a,
            RegisterEffect::Jump(_) | RegisterEffect::None => false,
        }
    }
}

/// The last instruction before `last_pc` that set `reg`, or `None` when
/// there is none or it is only reached through a jump.
pub fn find_set_reg(proto: &Proto, last_pc: usize, reg: usize) -> Option<usize> {
    let mut last_pc = last_pc;
    if proto
        .code
        .get(last_pc)
        .is_some_and(|i| i.opcode().is_mm_follow_up())
    {
        // the instruction before it has not finished executing
        last_pc = last_pc.saturating_sub(1);
    }
    let mut set_reg = None;
    // code below this pc is conditional
    let mut jump_target = 0usize;
    for (pc, &instruction) in proto.code.iter().enumerate().take(last_pc) {
        let effect = RegisterEffect::of(pc, instruction);
        if let RegisterEffect::Jump(dest) = effect {
            if dest > jump_target as isize && dest <= last_pc as isize {
                jump_target = dest as usize;
            }
        }
        if effect.writes(reg) {
            set_reg = if pc < jump_target { None } else { Some(pc) };
        }
    }
    set_reg
}

fn upvalue_name(proto: &Proto, index: usize) -> &str {
    proto
        .upvalues
        .get(index)
        .and_then(|u| u.name.as_deref())
        .unwrap_or("?")
}

/// The constant at `index` when it is a string.
fn constant_name(proto: &Proto, index: usize) -> Option<&str> {
    proto.constants.get(index).and_then(|k| k.as_str())
}

/// Local, upvalue or constant name of `reg` at `pc`, following register
/// moves to lower registers. Also returns the pc of the instruction that
/// set the register, when one was found.
fn basic_object_name(proto: &Proto, pc: usize, reg: usize) -> (Option<VarName>, Option<usize>) {
    let (mut pc, mut reg) = (pc, reg);
    loop {
        if let Some(name) = proto.local_name(reg + 1, pc) {
            return (Some(VarName::new(NameKind::Local, name)), Some(pc));
        }
        let Some(set_pc) = find_set_reg(proto, pc, reg) else {
            return (None, None);
        };
        let instruction = proto.code[set_pc];
        let name = match instruction.opcode() {
            Opcode::Move if instruction.b() < instruction.a() => {
                pc = set_pc;
                reg = instruction.b();
                continue;
            }
            Opcode::GetUpval => Some(VarName::new(
                NameKind::Upvalue,
                upvalue_name(proto, instruction.b()),
            )),
            Opcode::LoadK => constant_name(proto, instruction.bx())
                .map(|name| VarName::new(NameKind::Constant, name)),
            Opcode::LoadKx => proto
                .code
                .get(set_pc + 1)
                .and_then(|extra| constant_name(proto, extra.ax_arg() as usize))
                .map(|name| VarName::new(NameKind::Constant, name)),
            _ => None,
        };
        return (name, Some(set_pc));
    }
}

/// Name of a key held in register `reg`: only constant names count.
fn register_key_name(proto: &Proto, pc: usize, reg: usize) -> String {
    match basic_object_name(proto, pc, reg).0 {
        Some(VarName {
            kind: NameKind::Constant,
            name,
        }) => name,
        _ => "?".to_string(),
    }
}

fn constant_key_name(proto: &Proto, index: usize) -> String {
    constant_name(proto, index).unwrap_or("?").to_string()
}

/// `Global` when the table indexed by `instruction` is `_ENV`, else `Field`.
fn env_kind(proto: &Proto, pc: usize, instruction: Instruction, table_is_upvalue: bool) -> NameKind {
    let table = instruction.b();
    let name = if table_is_upvalue {
        Some(upvalue_name(proto, table).to_string())
    } else {
        match basic_object_name(proto, pc, table).0 {
            Some(VarName {
                kind: NameKind::Local | NameKind::Upvalue,
                name,
            }) => Some(name),
            _ => None,
        }
    };
    if name.as_deref() == Some(ENV_NAME) {
        NameKind::Global
    } else {
        NameKind::Field
    }
}

/// Best-effort name of the value in register `reg` just before the
/// instruction at `pc` runs. `None` when no trustworthy name exists.
pub fn describe(proto: &Proto, pc: usize, reg: usize) -> Option<VarName> {
    let (name, set_pc) = basic_object_name(proto, pc, reg);
    if name.is_some() {
        return name;
    }
    let set_pc = set_pc?;
    let instruction = proto.code[set_pc];
    match instruction.opcode() {
        Opcode::GetTabUp => Some(VarName::new(
            env_kind(proto, set_pc, instruction, true),
            constant_key_name(proto, instruction.c()),
        )),
        Opcode::GetTable => Some(VarName::new(
            env_kind(proto, set_pc, instruction, false),
            register_key_name(proto, set_pc, instruction.c()),
        )),
        Opcode::GetI => Some(VarName::new(NameKind::Field, "integer index")),
        Opcode::GetField => Some(VarName::new(
            env_kind(proto, set_pc, instruction, false),
            constant_key_name(proto, instruction.c()),
        )),
        Opcode::SelfOp => {
            let key = if instruction.k() {
                constant_key_name(proto, instruction.c())
            } else {
                register_key_name(proto, set_pc, instruction.c())
            };
            Some(VarName::new(NameKind::Method, key))
        }
        _ => None,
    }
}

/// Name of the function called by the instruction at `pc`, judging by the
/// instruction itself. Instructions that call metamethods report the
/// event name.
pub fn func_name_from_code(proto: &Proto, pc: usize) -> Option<VarName> {
    let instruction = *proto.code.get(pc)?;
    let event = match instruction.opcode() {
        Opcode::Call | Opcode::TailCall => return describe(proto, pc, instruction.a()),
        Opcode::TForCall => return Some(VarName::new(NameKind::ForIterator, "for iterator")),
        Opcode::SelfOp | Opcode::GetTabUp | Opcode::GetTable | Opcode::GetI | Opcode::GetField => {
            TagMethod::Index
        }
        Opcode::SetTabUp | Opcode::SetTable | Opcode::SetI | Opcode::SetField => {
            TagMethod::NewIndex
        }
        Opcode::MmBin | Opcode::MmBinI | Opcode::MmBinK => {
            TagMethod::from_index(instruction.c() as u32)?
        }
        Opcode::Unm => TagMethod::Unm,
        Opcode::BNot => TagMethod::BNot,
        Opcode::Len => TagMethod::Len,
        Opcode::Concat => TagMethod::Concat,
        Opcode::Eq => TagMethod::Eq,
        // EQI and EQK never call metamethods
        Opcode::Lt | Opcode::LtI | Opcode::GtI => TagMethod::Lt,
        Opcode::Le | Opcode::LeI | Opcode::GeI => TagMethod::Le,
        Opcode::Close | Opcode::Return => TagMethod::Close,
        _ => return None,
    };
    let name = event.name().trim_start_matches("__");
    Some(VarName::new(NameKind::Metamethod, name))
}

impl ThreadState {
    /// Name of the function frame `id` is currently calling, judging by
    /// how the call was made.
    pub fn func_name_from_call(&self, id: FrameId) -> Option<VarName> {
        let frame = self.frame(id)?;
        if frame.status.contains(CallStatus::HOOKED) {
            Some(VarName::new(NameKind::Hook, "?"))
        } else if frame.status.contains(CallStatus::FIN) {
            Some(VarName::new(NameKind::Metamethod, "__gc"))
        } else if frame.is_script() {
            let proto = self.frame_proto(id)?;
            func_name_from_code(&proto, frame.current_pc()?)
        } else {
            None
        }
    }
}
