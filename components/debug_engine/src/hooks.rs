//! Hook dispatcher.
//!
//! A single hook registration per thread: callback, event mask and count
//! budget. Interpreted frames carry a `trap` flag; while it is armed the
//! interpreter calls [`ThreadState::trace_exec`] before every instruction.
//!
//! # Example
//!
//! ```
//! use debug_engine::{HookAction, HookMask, ThreadState};
//! use std::rc::Rc;
//!
//! let mut state = ThreadState::new();
//! state.set_hook(Some(Rc::new(|_, _| HookAction::Continue)), HookMask::LINE, 0);
//! assert_eq!(state.hook_mask(), HookMask::LINE);
//!
//! state.set_hook(None, HookMask::LINE, 0);
//! assert!(state.hook_mask().is_empty());
//! assert!(state.hook().is_none());
//! ```

use crate::call_frame::{CallStatus, FrameId, Transfer};
use crate::context::{ThreadState, ThreadStatus, MIN_STACK};
use core_types::{SolError, SolResult};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Events a hook can be called for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    /// A function was entered
    Call,
    /// A function is returning
    Return,
    /// Execution reached a new line
    Line,
    /// The instruction budget ran out
    Count,
    /// A function was entered through a tail call
    TailCall,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookEvent::Call => "call",
            HookEvent::Return => "return",
            HookEvent::Line => "line",
            HookEvent::Count => "count",
            HookEvent::TailCall => "tail call",
        };
        f.write_str(name)
    }
}

/// Set of hook events to report. Tail calls are reported under `CALL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HookMask(u8);

impl HookMask {
    /// Function entry
    pub const CALL: HookMask = HookMask(1 << 0);
    /// Function return
    pub const RETURN: HookMask = HookMask(1 << 1);
    /// New line
    pub const LINE: HookMask = HookMask(1 << 2);
    /// Every `count` instructions
    pub const COUNT: HookMask = HookMask(1 << 3);

    /// No events.
    pub const fn empty() -> Self {
        HookMask(0)
    }

    /// Whether no event is selected.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether all events in `other` are selected.
    pub fn contains(self, other: HookMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any event in `other` is selected.
    pub fn intersects(self, other: HookMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for HookMask {
    type Output = HookMask;

    fn bitor(self, rhs: HookMask) -> HookMask {
        HookMask(self.0 | rhs.0)
    }
}

/// What the interpreter should do after a hook returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookAction {
    /// Keep running
    #[default]
    Continue,
    /// Suspend the thread (honoured for line and count events only)
    Yield,
}

/// What a hook callback is told about the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookRecord {
    /// The event being reported
    pub event: HookEvent,
    /// New line for line events
    pub current_line: Option<i32>,
    /// The frame the event happened in (stack level 0 while the hook runs)
    pub frame: FrameId,
}

/// A hook callback. It may inspect and modify the thread, including
/// replacing or removing the hook itself.
pub type Hook = Rc<dyn Fn(&mut ThreadState, &HookRecord) -> HookAction>;

impl ThreadState {
    /// Install a hook, or remove it with `None` or an empty mask.
    ///
    /// Resets the count budget and, when the mask is non-empty, arms the
    /// trap of every interpreted frame in the chain.
    pub fn set_hook(&mut self, hook: Option<Hook>, mask: HookMask, count: i32) {
        let (hook, mask) = match hook {
            Some(hook) if !mask.is_empty() => (Some(hook), mask),
            _ => (None, HookMask::empty()),
        };
        debug!(?mask, count, installed = hook.is_some(), "set hook");
        self.hook = hook;
        self.base_hook_count = count;
        self.hook_count = count;
        self.hook_mask = mask;
        if !mask.is_empty() {
            self.arm_traps();
        }
    }

    fn arm_traps(&mut self) {
        let mut next = Some(self.current_frame_id());
        while let Some(id) = next {
            let frame = &mut self.frames[id];
            frame.set_trap(true);
            next = frame.previous;
        }
    }

    /// The installed hook.
    pub fn hook(&self) -> Option<&Hook> {
        self.hook.as_ref()
    }

    /// The installed event mask.
    pub fn hook_mask(&self) -> HookMask {
        self.hook_mask
    }

    /// The configured count budget.
    pub fn hook_count(&self) -> i32 {
        self.base_hook_count
    }

    /// Call the hook for `event` in the current frame.
    ///
    /// `first`/`count` describe values transferred across the call
    /// boundary (count 0: none). Does nothing while hooks are disallowed.
    pub fn fire_hook(
        &mut self,
        event: HookEvent,
        line: Option<i32>,
        first: usize,
        count: usize,
    ) -> HookAction {
        let hook = match &self.hook {
            Some(hook) if self.allow_hook => Rc::clone(hook),
            _ => return HookAction::Continue,
        };
        let id = self.current_frame_id();
        let saved_top = self.top;
        let saved_frame_top = self.frames[id].top;

        let mut mask = CallStatus::HOOKED;
        if count != 0 {
            mask.insert(CallStatus::TRANSFER);
            self.frames[id].transfer = Transfer { first, count };
        }
        if self.frames[id].is_script() && self.top < saved_frame_top {
            // protect the whole register window
            self.top = saved_frame_top;
        }
        self.ensure_stack(MIN_STACK);
        let frame = &mut self.frames[id];
        if frame.top < self.top + MIN_STACK {
            frame.top = self.top + MIN_STACK;
        }
        frame.status.insert(mask);
        self.allow_hook = false;

        trace!(%event, ?line, frame = id, "hook");
        let record = HookRecord {
            event,
            current_line: line,
            frame: id,
        };
        let action = hook(self, &record);

        self.allow_hook = true;
        if let Some(frame) = self.frames.get_mut(id) {
            frame.top = saved_frame_top;
            frame.status.remove(mask);
        }
        self.top = saved_top;

        match (event, action) {
            (HookEvent::Line | HookEvent::Count, HookAction::Yield) => {
                self.status = ThreadStatus::Yield;
                HookAction::Yield
            }
            (_, HookAction::Yield) => {
                debug!(%event, "yield from call/return hook ignored");
                HookAction::Continue
            }
            _ => HookAction::Continue,
        }
    }

    /// Hook bookkeeping on entry to an interpreted function. Returns
    /// whether the trap must stay armed.
    ///
    /// The call hook of a vararg function is deferred to
    /// [`hook_vararg_prep`](Self::hook_vararg_prep), so that no line or
    /// count hook fires before it.
    pub fn trace_call(&mut self) -> bool {
        let id = self.current_frame_id();
        let Some(proto) = self.frame_proto(id) else {
            return false;
        };
        let frame = &mut self.frames[id];
        frame.set_trap(true);
        if frame.saved_pc() == Some(0) {
            if proto.is_vararg {
                return false;
            } else if !frame.status.contains(CallStatus::HOOK_YIELD) {
                self.hook_call(id);
            }
        }
        true
    }

    /// Fire the call (or tail-call) hook for a freshly entered frame.
    pub fn hook_call(&mut self, id: FrameId) {
        self.old_pc = 0;
        if !self.hook_mask.contains(HookMask::CALL) {
            return;
        }
        let Some(frame) = self.frames.get(id) else {
            return;
        };
        let event = if frame.is_tail_call() {
            HookEvent::TailCall
        } else {
            HookEvent::Call
        };
        let params = self.frame_proto(id).map_or(0, |p| p.num_params as usize);
        let pc = frame.saved_pc().unwrap_or(0);
        // hooks see the pc already incremented
        self.frames[id].set_saved_pc(pc + 1);
        self.fire_hook(event, None, 1, params);
        if let Some(frame) = self.frames.get_mut(id) {
            frame.set_saved_pc(pc);
        }
    }

    /// Fire the return hook for the current frame, whose `nresults`
    /// results are on top of the stack, then reset the line tracking to
    /// the caller.
    pub fn hook_return(&mut self, nresults: usize) {
        let id = self.current_frame_id();
        if self.hook_mask.contains(HookMask::RETURN) {
            let first_result = self.top.saturating_sub(nresults);
            // relative to the virtual function slot of vararg frames
            let first = first_result.saturating_sub(self.frames[id].func);
            self.fire_hook(HookEvent::Return, None, first, nresults);
        }
        let caller = self.frames[id].previous.and_then(|p| self.frames.get(p));
        if let Some(pc) = caller.and_then(|c| c.current_pc()) {
            self.old_pc = pc;
        }
    }

    /// Deferred call hook of a vararg function, run right after its
    /// arguments were adjusted.
    pub fn hook_vararg_prep(&mut self) {
        let id = self.current_frame_id();
        if self.frames[id].trap() {
            self.hook_call(id);
            // the next instruction counts as a new line
            self.old_pc = 1;
        }
    }

    /// Hook dispatch before executing the instruction at `pc` of the
    /// current frame. `Ok(false)` disarms the trap.
    ///
    /// Returns `Err` with the yield signal when a line or count hook
    /// suspended the thread.
    pub fn trace_exec(&mut self, pc: usize) -> SolResult<bool> {
        let id = self.current_frame_id();
        let mask = self.hook_mask;
        let Some(proto) = self.frame_proto(id) else {
            return Ok(false);
        };
        if !mask.intersects(HookMask::LINE | HookMask::COUNT) {
            self.frames[id].set_trap(false);
            return Ok(false);
        }
        self.frames[id].set_saved_pc(pc + 1);

        self.hook_count = self.hook_count.wrapping_sub(1);
        let count_hook = self.hook_count == 0 && mask.contains(HookMask::COUNT);
        if count_hook {
            self.hook_count = self.base_hook_count;
        } else if !mask.contains(HookMask::LINE) {
            return Ok(true);
        }

        let frame = &mut self.frames[id];
        if frame.status.contains(CallStatus::HOOK_YIELD) {
            // this instruction already had its hook before the yield
            frame.status.remove(CallStatus::HOOK_YIELD);
            return Ok(true);
        }
        let uses_top = proto.code.get(pc).is_some_and(|i| i.uses_open_top());
        if !uses_top {
            self.top = frame.top;
        }

        if count_hook {
            self.fire_hook(HookEvent::Count, None, 0, 0);
        }
        if mask.contains(HookMask::LINE) {
            let old_pc = if self.old_pc < proto.code.len() {
                self.old_pc
            } else {
                0
            };
            if pc <= old_pc || proto.line_changed(old_pc, pc) {
                let line = proto.line_for(pc);
                self.fire_hook(HookEvent::Line, line, 0, 0);
            }
            self.old_pc = pc;
        }

        if self.status == ThreadStatus::Yield {
            if count_hook {
                self.hook_count = 1;
            }
            if let Some(frame) = self.frames.get_mut(id) {
                frame.status.insert(CallStatus::HOOK_YIELD);
            }
            return Err(SolError::yielded());
        }
        Ok(true)
    }

    /// Continue a thread suspended by a hook. The instruction that was
    /// about to run is run again, without re-firing its hook.
    pub fn resume(&mut self) {
        if self.status != ThreadStatus::Yield {
            return;
        }
        self.status = ThreadStatus::Ok;
        let id = self.current_frame_id();
        let frame = &mut self.frames[id];
        if let Some(pc) = frame.saved_pc() {
            frame.set_saved_pc(pc.saturating_sub(1));
        }
    }
}
