//! Hook dispatcher tests

use super::{enter, kinds, recording_hook, straight_line, Events};
use bytecode_system::{Instruction, Opcode, ProtoBuilder};
use core_types::{ErrorKind, Value};
use debug_engine::{
    CallStatus, HookAction, HookEvent, HookMask, HookRecord, ThreadState, ThreadStatus,
};
use std::cell::Cell;
use std::rc::Rc;

// ============================================================================
// Call and return events
// ============================================================================

#[test]
fn test_call_hook_fires_for_every_entry() {
    let mut state = ThreadState::new();
    let events = Events::default();
    state.set_hook(Some(recording_hook(&events)), HookMask::CALL, 0);

    for depth in 1..=5 {
        let id = enter(&mut state, straight_line("@chain.sol", 1, &[2]), &[], CallStatus::empty());
        assert!(state.trace_call());
        assert_eq!(id, depth);
    }

    assert_eq!(kinds(&events), vec![HookEvent::Call; 5]);
    assert_eq!(state.frame_at(2), Some(3));
    assert_eq!(state.frame_at(10), None);
    // no line or count hook: the first step disarms the trap
    assert!(!state.trace_exec(0).unwrap());
    assert!(!state.current_frame().trap());
}

#[test]
fn test_tail_call_event() {
    let mut state = ThreadState::new();
    let events = Events::default();
    state.set_hook(Some(recording_hook(&events)), HookMask::CALL, 0);
    enter(&mut state, straight_line("@t.sol", 1, &[2]), &[], CallStatus::TAIL);
    state.trace_call();
    assert_eq!(kinds(&events), vec![HookEvent::TailCall]);
}

#[test]
fn test_call_hook_reports_parameters_as_transfer() {
    let mut state = ThreadState::new();
    let seen = Rc::new(Cell::new((0, 0, 0)));
    let seen_in_hook = Rc::clone(&seen);
    state.set_hook(
        Some(Rc::new(move |s: &mut ThreadState, r: &HookRecord| {
            let info = s.function_description(r.frame).unwrap();
            let pc = s.frame(r.frame).unwrap().saved_pc().unwrap();
            seen_in_hook.set((info.first_transfer, info.transfer_count, pc));
            HookAction::Continue
        })),
        HookMask::CALL,
        0,
    );
    let mut builder = ProtoBuilder::new().params(2).max_stack(4);
    builder.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 1);
    let id = enter(&mut state, builder.build(), &[7, 8], CallStatus::empty());
    state.trace_call();

    // the hook sees the pc already incremented
    assert_eq!(seen.get(), (1, 2, 1));
    let frame = state.frame(id).unwrap();
    assert_eq!(frame.saved_pc(), Some(0));
    assert!(!frame.status.contains(CallStatus::TRANSFER));
}

#[test]
fn test_return_hook_transfer_and_results() {
    let mut state = ThreadState::new();
    let seen = Rc::new(Cell::new((HookEvent::Call, 0, 0)));
    let seen_in_hook = Rc::clone(&seen);
    state.set_hook(
        Some(Rc::new(move |s: &mut ThreadState, r: &HookRecord| {
            let info = s.function_description(r.frame).unwrap();
            seen_in_hook.set((r.event, info.first_transfer, info.transfer_count));
            HookAction::Continue
        })),
        HookMask::RETURN,
        0,
    );
    let id = enter(&mut state, straight_line("@r.sol", 1, &[2]), &[], CallStatus::empty());
    let func = state.frame(id).unwrap().func;
    state.push(Value::from("a"));
    state.push(Value::from("b"));

    assert_eq!(state.pop_frame(2), Some(0));
    assert_eq!(seen.get(), (HookEvent::Return, 1, 2));
    assert_eq!(state.stack_value(func), Some(&Value::from("a")));
    assert_eq!(state.stack_value(func + 1), Some(&Value::from("b")));
    assert_eq!(state.top(), func + 2);
}

#[test]
fn test_native_call_hook() {
    let mut state = ThreadState::new();
    let events = Events::default();
    state.set_hook(Some(recording_hook(&events)), HookMask::CALL, 0);
    let native = state.register_native("print", 0);
    let slot = state.top();
    state.push(native);
    state.push(Value::Integer(1));
    let id = state.push_native_frame(slot).unwrap();
    assert_eq!(kinds(&events), vec![HookEvent::Call]);
    assert_eq!(events.borrow()[0].2, id);
}

// ============================================================================
// Vararg functions
// ============================================================================

#[test]
fn test_vararg_call_hook_is_deferred() {
    let mut state = ThreadState::new();
    let events = Events::default();
    state.set_hook(
        Some(recording_hook(&events)),
        HookMask::CALL | HookMask::LINE,
        0,
    );
    let mut builder = ProtoBuilder::new().lines(1, 5).vararg().params(1).max_stack(3);
    builder.emit(Instruction::abc(Opcode::VarArgPrep, 1, 0, 0), 1);
    builder.emit(Instruction::abc(Opcode::Move, 2, 1, 0), 2);
    builder.emit(Instruction::abc(Opcode::Return0, 0, 0, 0), 2);
    enter(&mut state, builder.build(), &[1, 2, 3], CallStatus::empty());

    // entry: nothing fires, no tracing for VARARGPREP itself
    assert!(!state.trace_call());
    assert!(events.borrow().is_empty());

    // VARARGPREP runs
    let id = state.current_frame_id();
    state.frame_mut(id).unwrap().set_saved_pc(1);
    state.adjust_varargs(1);
    state.hook_vararg_prep();
    assert_eq!(kinds(&events), vec![HookEvent::Call]);

    // the next instruction counts as a new line
    assert!(state.trace_exec(1).unwrap());
    assert!(state.trace_exec(2).unwrap());
    assert_eq!(kinds(&events), vec![HookEvent::Call, HookEvent::Line]);
    assert_eq!(events.borrow()[1].1, Some(2));
}

// ============================================================================
// Line and count events
// ============================================================================

#[test]
fn test_line_hook_sequence() {
    let mut state = ThreadState::new();
    let events = Events::default();
    enter(&mut state, straight_line("@l.sol", 1, &[2, 2, 3, 5, 5]), &[], CallStatus::empty());
    state.set_hook(Some(recording_hook(&events)), HookMask::LINE, 0);
    for pc in 0..5 {
        assert!(state.trace_exec(pc).unwrap());
    }
    let lines: Vec<_> = events.borrow().iter().map(|(_, line, _)| *line).collect();
    assert_eq!(lines, vec![Some(2), Some(3), Some(5)]);
}

#[test]
fn test_loop_refires_same_line() {
    let mut state = ThreadState::new();
    let events = Events::default();
    enter(&mut state, straight_line("@l.sol", 1, &[4, 4, 4]), &[], CallStatus::empty());
    state.set_hook(Some(recording_hook(&events)), HookMask::LINE, 0);
    for pc in [0, 1, 2, 0, 1, 2] {
        state.trace_exec(pc).unwrap();
    }
    assert_eq!(events.borrow().len(), 2);
}

#[test]
fn test_line_and_count_together() {
    let mut state = ThreadState::new();
    let events = Events::default();
    enter(&mut state, straight_line("@c.sol", 1, &[2, 3, 4, 5]), &[], CallStatus::empty());
    state.set_hook(
        Some(recording_hook(&events)),
        HookMask::LINE | HookMask::COUNT,
        2,
    );
    for pc in 0..4 {
        state.trace_exec(pc).unwrap();
    }
    assert_eq!(
        kinds(&events),
        vec![
            HookEvent::Line,
            HookEvent::Count,
            HookEvent::Line,
            HookEvent::Line,
            HookEvent::Count,
            HookEvent::Line,
        ]
    );
    assert_eq!(state.hook_count(), 2);
}

#[test]
fn test_removing_hook_inside_hook_stops_next_step() {
    let mut state = ThreadState::new();
    let fired = Rc::new(Cell::new(0));
    let fired_in_hook = Rc::clone(&fired);
    enter(&mut state, straight_line("@h.sol", 1, &[2, 3, 4, 5]), &[], CallStatus::empty());
    state.set_hook(
        Some(Rc::new(move |s: &mut ThreadState, _: &HookRecord| {
            fired_in_hook.set(fired_in_hook.get() + 1);
            s.set_hook(None, HookMask::empty(), 0);
            HookAction::Continue
        })),
        HookMask::LINE,
        0,
    );
    assert!(state.current_frame().trap());
    assert!(state.trace_exec(0).unwrap());
    assert!(!state.trace_exec(1).unwrap());
    assert!(!state.current_frame().trap());
    assert_eq!(fired.get(), 1);
    assert!(state.hook().is_none());
}

#[test]
fn test_hooks_do_not_nest() {
    let mut state = ThreadState::new();
    let fired = Rc::new(Cell::new(0));
    let fired_in_hook = Rc::clone(&fired);
    enter(&mut state, straight_line("@n.sol", 1, &[2]), &[], CallStatus::empty());
    state.set_hook(
        Some(Rc::new(move |s: &mut ThreadState, _: &HookRecord| {
            fired_in_hook.set(fired_in_hook.get() + 1);
            s.fire_hook(HookEvent::Line, Some(99), 0, 0);
            HookAction::Continue
        })),
        HookMask::LINE,
        0,
    );
    state.trace_exec(0).unwrap();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_hook_sees_full_register_window() {
    let mut state = ThreadState::new();
    let seen_top = Rc::new(Cell::new(0));
    let seen_in_hook = Rc::clone(&seen_top);
    let id = enter(&mut state, straight_line("@w.sol", 1, &[2]), &[], CallStatus::empty());
    state.set_hook(
        Some(Rc::new(move |s: &mut ThreadState, _: &HookRecord| {
            seen_in_hook.set(s.top());
            HookAction::Continue
        })),
        HookMask::LINE,
        0,
    );
    let frame_top = state.frame(id).unwrap().top;
    state.trace_exec(0).unwrap();
    assert_eq!(seen_top.get(), frame_top);
    assert_eq!(state.top(), frame_top);
    assert_eq!(state.frame(id).unwrap().top, frame_top);
}

// ============================================================================
// Yielding hooks
// ============================================================================

#[test]
fn test_count_hook_yield_and_resume() {
    let mut state = ThreadState::new();
    let fired = Rc::new(Cell::new(0));
    let fired_in_hook = Rc::clone(&fired);
    let id = enter(&mut state, straight_line("@y.sol", 1, &[2, 2, 2]), &[], CallStatus::empty());
    state.set_hook(
        Some(Rc::new(move |_: &mut ThreadState, _: &HookRecord| {
            fired_in_hook.set(fired_in_hook.get() + 1);
            if fired_in_hook.get() == 1 {
                HookAction::Yield
            } else {
                HookAction::Continue
            }
        })),
        HookMask::COUNT,
        1,
    );

    let err = state.trace_exec(0).unwrap_err();
    assert!(err.is_yield());
    assert_eq!(err.kind, ErrorKind::Yield);
    assert_eq!(state.status(), ThreadStatus::Yield);
    assert!(state.frame(id).unwrap().status.contains(CallStatus::HOOK_YIELD));
    assert_eq!(state.frame(id).unwrap().saved_pc(), Some(1));

    state.resume();
    assert_eq!(state.status(), ThreadStatus::Ok);
    assert_eq!(state.frame(id).unwrap().saved_pc(), Some(0));

    // the same instruction again: no second hook for it
    assert!(state.trace_exec(0).unwrap());
    assert_eq!(fired.get(), 1);
    assert!(!state.frame(id).unwrap().status.contains(CallStatus::HOOK_YIELD));

    assert!(state.trace_exec(1).unwrap());
    assert_eq!(fired.get(), 2);
}

#[test]
fn test_line_hook_yield_does_not_refire() {
    let mut state = ThreadState::new();
    let events = Events::default();
    let events_in_hook = Rc::clone(&events);
    enter(&mut state, straight_line("@y.sol", 1, &[2, 2, 3]), &[], CallStatus::empty());
    state.set_hook(
        Some(Rc::new(move |_: &mut ThreadState, r: &HookRecord| {
            events_in_hook
                .borrow_mut()
                .push((r.event, r.current_line, r.frame));
            HookAction::Yield
        })),
        HookMask::LINE,
        0,
    );

    assert!(state.trace_exec(0).unwrap_err().is_yield());
    state.resume();
    assert!(state.trace_exec(0).unwrap());
    assert!(state.trace_exec(1).unwrap());
    assert_eq!(events.borrow().len(), 1);

    assert!(state.trace_exec(2).unwrap_err().is_yield());
    assert_eq!(events.borrow().len(), 2);
    assert_eq!(events.borrow()[1].1, Some(3));
}

#[test]
fn test_resume_without_yield_is_noop() {
    let mut state = ThreadState::new();
    let id = enter(&mut state, straight_line("@y.sol", 1, &[2]), &[], CallStatus::empty());
    state.frame_mut(id).unwrap().set_saved_pc(1);
    state.resume();
    assert_eq!(state.frame(id).unwrap().saved_pc(), Some(1));
}
