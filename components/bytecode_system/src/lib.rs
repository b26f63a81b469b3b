//! Bytecode system for the Sol virtual machine
//!
//! This crate provides the register instruction set, compiled function
//! prototypes and the compressed line table that maps instructions back to
//! source lines.
//!
//! # Features
//!
//! - 83-opcode register instruction set with static mode properties
//! - Fixed-width 32-bit instruction encoding
//! - Immutable, shareable function prototypes
//! - Line-table encoding (builder) and decoding (lookups, valid lines)
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Instruction, Opcode, ProtoBuilder};
//!
//! let mut builder = ProtoBuilder::new().source("@main.sol").lines(0, 0);
//! let k = builder.add_constant("hello".into());
//! builder.emit(Instruction::abx(Opcode::LoadK, 0, k as u32), 1);
//! builder.emit(Instruction::abc(Opcode::Return1, 0, 0, 0), 2);
//! builder.add_local("greeting", 1, 2);
//!
//! let proto = builder.build();
//! assert_eq!(proto.line_for(1), Some(2));
//! assert_eq!(proto.local_name(1, 1), Some("greeting"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod instruction;
pub mod line_table;
pub mod opcode;
pub mod proto;
pub mod tagmethod;

// Re-export main types at crate root
pub use instruction::{Instruction, MAXARG_ABC, MAXARG_AX, MAXARG_BX, OFFSET_SBX, OFFSET_SC, OFFSET_SJ};
pub use line_table::{AbsLineInfo, ABS_LINE_INFO, LINE_DIFF_LIMIT, MAX_INSTRUCTIONS_WITHOUT_ABS};
pub use opcode::{OpMode, Opcode, NUM_OPCODES};
pub use proto::{LocVar, Proto, ProtoBuilder, UpvalDesc};
pub use tagmethod::TagMethod;
