//! Integration test suite for the Sol VM debugging core
//!
//! This crate provides end-to-end tests that verify components work
//! together across component boundaries, plus a minimal stepping loop
//! standing in for the interpreter.

use bytecode_system::Opcode;
use core_types::{SolError, SolResult};
use debug_engine::ThreadState;

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use core_types;
    pub use debug_engine;
    pub use memory_manager;
}

/// Step through the running interpreted frame, dispatching hooks the way
/// the interpreter does, for at most `max_steps` instructions.
///
/// Only control flow is modelled: `JMP` jumps, `VARARGPREP` adjusts the
/// arguments, any return pops the frame, and everything else falls
/// through. Returns the number of instructions executed; a yielding hook
/// surfaces as the yield error.
pub fn run_frame(state: &mut ThreadState, max_steps: usize) -> SolResult<usize> {
    let id = state.current_frame_id();
    let proto = state
        .frame_proto(id)
        .ok_or_else(|| SolError::runtime("not an interpreted frame"))?;
    let mut trap = !state.hook_mask().is_empty() && state.trace_call();
    let mut steps = 0;

    while steps < max_steps {
        let pc = state.frame(id).and_then(|f| f.saved_pc()).unwrap_or(0);
        let Some(&instruction) = proto.code.get(pc) else {
            break;
        };
        if trap {
            trap = state.trace_exec(pc)?;
        }
        steps += 1;

        let next = match instruction.opcode() {
            Opcode::Jmp => (pc as isize + 1 + instruction.sj_arg() as isize) as usize,
            Opcode::VarArgPrep => {
                if let Some(frame) = state.frame_mut(id) {
                    frame.set_saved_pc(pc + 1);
                }
                state.adjust_varargs(instruction.a());
                state.hook_vararg_prep();
                trap = state.frame(id).is_some_and(|f| f.trap());
                pc + 1
            }
            Opcode::Return | Opcode::Return0 | Opcode::Return1 => {
                if let Some(frame) = state.frame_mut(id) {
                    frame.set_saved_pc(pc + 1);
                }
                state.pop_frame(0);
                return Ok(steps);
            }
            _ => pc + 1,
        };
        if let Some(frame) = state.frame_mut(id) {
            frame.set_saved_pc(next);
        }
    }
    Ok(steps)
}
