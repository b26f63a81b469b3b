//! Function prototypes and their builder.

use crate::instruction::Instruction;
use crate::line_table::{AbsLineInfo, ABS_LINE_INFO, LINE_DIFF_LIMIT, MAX_INSTRUCTIONS_WITHOUT_ABS};
use core_types::Value;
use std::rc::Rc;

/// Descriptor of an upvalue captured by a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpvalDesc {
    /// Variable name, if debug information was kept
    pub name: Option<String>,
    /// Captured from a register of the enclosing function (true) or from
    /// one of its upvalues (false)
    pub in_stack: bool,
    /// Register or upvalue index in the enclosing function
    pub index: u8,
}

/// Descriptor of a local variable and the instructions where it is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocVar {
    /// Variable name
    pub name: String,
    /// First instruction where the variable is active
    pub start_pc: usize,
    /// First instruction where the variable is dead
    pub end_pc: usize,
}

/// An immutable compiled function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Proto {
    /// Instructions
    pub code: Vec<Instruction>,
    /// Constant pool
    pub constants: Vec<Value>,
    /// Upvalue descriptors
    pub upvalues: Vec<UpvalDesc>,
    /// Nested functions
    pub protos: Vec<Rc<Proto>>,
    /// Local variable descriptors, ordered by `start_pc`
    pub loc_vars: Vec<LocVar>,
    /// Per-instruction line deltas; empty when line information was stripped
    pub line_info: Vec<i8>,
    /// Absolute line checkpoints
    pub abs_line_info: Vec<AbsLineInfo>,
    /// Maximum number of instructions between two checkpoints
    pub line_stride: usize,
    /// Source identifier (`@file`, `=literal` or source text)
    pub source: Option<String>,
    /// Line where the definition starts (0 for a main chunk)
    pub line_defined: i32,
    /// Line where the definition ends
    pub last_line_defined: i32,
    /// Takes variable arguments
    pub is_vararg: bool,
    /// Number of fixed parameters
    pub num_params: u8,
    /// Registers needed by the function
    pub max_stack_size: u8,
}

impl Proto {
    /// Name of the `n`-th (1-based) local variable active at `pc`.
    pub fn local_name(&self, n: usize, pc: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        let mut remaining = n;
        for var in self.loc_vars.iter().take_while(|v| v.start_pc <= pc) {
            if pc < var.end_pc {
                remaining -= 1;
                if remaining == 0 {
                    return Some(&var.name);
                }
            }
        }
        None
    }

    /// A main chunk is defined at line 0.
    pub fn is_main(&self) -> bool {
        self.line_defined == 0
    }

    /// Whether line information is available.
    pub fn has_line_info(&self) -> bool {
        !self.line_info.is_empty()
    }
}

/// Incremental builder of a [`Proto`], encoding the line table as
/// instructions are emitted.
///
/// # Examples
///
/// ```
/// use bytecode_system::{Instruction, Opcode, ProtoBuilder};
///
/// let mut builder = ProtoBuilder::new().source("@demo.sol").lines(1, 3);
/// builder.emit(Instruction::asbx(Opcode::LoadI, 0, 7), 2);
/// builder.emit(Instruction::abc(Opcode::Return1, 0, 0, 0), 3);
/// let proto = builder.build();
/// assert_eq!(proto.line_for(0), Some(2));
/// assert_eq!(proto.line_for(1), Some(3));
/// ```
#[derive(Debug)]
pub struct ProtoBuilder {
    proto: Proto,
    previous_line: i32,
    since_checkpoint: usize,
    keep_lines: bool,
}

impl Default for ProtoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtoBuilder {
    /// A builder for an empty, non-vararg function with no parameters.
    pub fn new() -> Self {
        ProtoBuilder {
            proto: Proto {
                line_stride: MAX_INSTRUCTIONS_WITHOUT_ABS,
                max_stack_size: 2,
                ..Proto::default()
            },
            previous_line: 0,
            since_checkpoint: 0,
            keep_lines: true,
        }
    }

    /// Set the checkpoint stride. Call before emitting.
    pub fn with_line_stride(mut self, stride: usize) -> Self {
        self.proto.line_stride = stride.max(1);
        self
    }

    /// Set the source identifier.
    pub fn source(mut self, source: &str) -> Self {
        self.proto.source = Some(source.to_string());
        self
    }

    /// Set the defined-line range. Call before emitting: line deltas start
    /// from `defined`.
    pub fn lines(mut self, defined: i32, last: i32) -> Self {
        self.proto.line_defined = defined;
        self.proto.last_line_defined = last;
        self.previous_line = defined;
        self
    }

    /// Mark the function as taking variable arguments.
    pub fn vararg(mut self) -> Self {
        self.proto.is_vararg = true;
        self
    }

    /// Set the number of fixed parameters.
    pub fn params(mut self, count: u8) -> Self {
        self.proto.num_params = count;
        self
    }

    /// Set the register count.
    pub fn max_stack(mut self, size: u8) -> Self {
        self.proto.max_stack_size = size;
        self
    }

    /// Drop line information from the built prototype.
    pub fn strip_line_info(mut self) -> Self {
        self.keep_lines = false;
        self
    }

    /// Number of instructions emitted so far.
    pub fn pc(&self) -> usize {
        self.proto.code.len()
    }

    /// Append `instruction`, attributed to source `line`, and return its pc.
    pub fn emit(&mut self, instruction: Instruction, line: i32) -> usize {
        let pc = self.proto.code.len();
        self.proto.code.push(instruction);

        let mut delta = line - self.previous_line;
        let needs_checkpoint = delta.abs() >= LINE_DIFF_LIMIT || {
            let passed = self.since_checkpoint;
            self.since_checkpoint += 1;
            passed >= self.proto.line_stride
        };
        if needs_checkpoint {
            self.proto.abs_line_info.push(AbsLineInfo { pc, line });
            delta = ABS_LINE_INFO as i32;
            self.since_checkpoint = 1;
        }
        self.proto.line_info.push(delta as i8);
        self.previous_line = line;
        pc
    }

    /// Replace the instruction at `pc`, e.g. to fix a jump offset.
    pub fn patch(&mut self, pc: usize, instruction: Instruction) {
        if let Some(slot) = self.proto.code.get_mut(pc) {
            *slot = instruction;
        }
    }

    /// Add a constant and return its index.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.proto.constants.push(value);
        self.proto.constants.len() - 1
    }

    /// Declare a local variable live over `[start_pc, end_pc)`.
    pub fn add_local(&mut self, name: &str, start_pc: usize, end_pc: usize) -> usize {
        self.proto.loc_vars.push(LocVar {
            name: name.to_string(),
            start_pc,
            end_pc,
        });
        self.proto.loc_vars.len() - 1
    }

    /// Declare an upvalue.
    pub fn add_upvalue(&mut self, name: Option<&str>, in_stack: bool, index: u8) -> usize {
        self.proto.upvalues.push(UpvalDesc {
            name: name.map(str::to_string),
            in_stack,
            index,
        });
        self.proto.upvalues.len() - 1
    }

    /// Add a nested function.
    pub fn add_proto(&mut self, proto: Rc<Proto>) -> usize {
        self.proto.protos.push(proto);
        self.proto.protos.len() - 1
    }

    /// Finish the prototype.
    pub fn build(mut self) -> Proto {
        if !self.keep_lines {
            self.proto.line_info.clear();
            self.proto.abs_line_info.clear();
        }
        self.proto
    }
}
