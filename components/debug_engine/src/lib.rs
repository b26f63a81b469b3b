//! Introspection and debugging engine for the Sol virtual machine.
//!
//! This crate provides the debugging surface of the interpreter:
//! - Per-thread state: value stack, call-frame chain and hook registration
//! - Symbolic name resolution over bytecode
//! - Stack-level queries, local variable access and function descriptions
//! - Call/return/line/count hook dispatch, including yields from hooks
//! - Runtime error messages that name the offending variable
//!
//! # Example
//!
//! ```
//! use bytecode_system::{Instruction, Opcode, ProtoBuilder};
//! use debug_engine::{CallStatus, Closure, ThreadState};
//! use std::rc::Rc;
//!
//! let mut builder = ProtoBuilder::new().source("@main.sol").lines(0, 0);
//! builder.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 1);
//! let main = Rc::new(builder.build());
//!
//! let mut state = ThreadState::new();
//! let function = state.register_closure(Closure::with_nil_upvalues(main));
//! let slot = state.top();
//! state.push(function);
//! state.push_script_frame(slot, CallStatus::empty()).unwrap();
//!
//! let frame = state.frame_at(0).unwrap();
//! let info = state.function_description(frame).unwrap();
//! assert_eq!(info.short_src, "main.sol");
//! assert_eq!(info.current_line, Some(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_frame;
pub mod closure;
pub mod context;
pub mod errors;
pub mod hooks;
pub mod resolver;
pub mod walker;

// Re-export main types at crate root
pub use call_frame::{CallFrame, CallStatus, FrameId, FrameKind, Transfer, BASE_FRAME};
pub use closure::{new_upvalue_handle, Closure, FunctionObject, Upvalue, UpvalueHandle};
pub use context::{ErrorHandler, ThreadState, ThreadStatus, MIN_STACK};
pub use errors::{add_info, ValueRef};
pub use hooks::{Hook, HookAction, HookEvent, HookMask, HookRecord};
pub use resolver::{describe, find_set_reg, func_name_from_code, NameKind, VarName, ENV_NAME};
pub use walker::{FuncInfo, FunctionKind};
