//! Per-interpreter state: value stack, frame chain and hook registration.

use crate::call_frame::{CallFrame, CallStatus, FrameId, FrameKind, BASE_FRAME};
use crate::closure::{Closure, FunctionObject};
use crate::errors::ValueRef;
use crate::hooks::{Hook, HookEvent, HookMask};
use bytecode_system::Proto;
use core_types::{SolResult, Value};
use std::fmt;
use std::rc::Rc;

/// Stack slots guaranteed to a native function or a hook callback.
pub const MIN_STACK: usize = 20;

/// Slots kept free above every frame top.
const EXTRA_STACK: usize = 5;

/// Whether the thread is running or suspended by a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadStatus {
    /// Running normally
    #[default]
    Ok,
    /// Suspended; must be resumed before running again
    Yield,
}

/// Formats uncaught error messages, e.g. to append a traceback. An `Err`
/// means the handler itself failed.
pub type ErrorHandler = Rc<dyn Fn(&ThreadState, &str) -> Result<String, String>>;

/// Execution state of one interpreter thread.
///
/// The interpreter loop owns the instruction dispatch; this struct owns
/// everything the debug engine reads: the value stack, the chain of call
/// frames (newest last in the arena, linked through `previous`), the
/// function objects referenced by `Value::Function`, and the hook
/// registration.
pub struct ThreadState {
    pub(crate) stack: Vec<Value>,
    pub(crate) top: usize,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) functions: Vec<FunctionObject>,
    pub(crate) hook: Option<Hook>,
    pub(crate) hook_mask: HookMask,
    pub(crate) base_hook_count: i32,
    pub(crate) hook_count: i32,
    pub(crate) old_pc: usize,
    pub(crate) status: ThreadStatus,
    pub(crate) allow_hook: bool,
    pub(crate) error_handler: Option<ErrorHandler>,
}

impl Default for ThreadState {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadState {
    /// A thread with only the base sentinel frame.
    pub fn new() -> Self {
        // slot 0 is the sentinel's function slot
        let stack = vec![Value::Nil; 2 * MIN_STACK];
        ThreadState {
            stack,
            top: 1,
            frames: vec![CallFrame::native(0, 1 + MIN_STACK, None)],
            functions: Vec::new(),
            hook: None,
            hook_mask: HookMask::empty(),
            base_hook_count: 0,
            hook_count: 0,
            old_pc: 0,
            status: ThreadStatus::Ok,
            allow_hook: true,
            error_handler: None,
        }
    }

    // ------------------------------------------------------------------
    // Value stack
    // ------------------------------------------------------------------

    /// First free stack slot.
    pub fn top(&self) -> usize {
        self.top
    }

    /// Move the stack top. Slots above the old top read as nil.
    pub fn set_top(&mut self, top: usize) {
        self.grow_to(top + EXTRA_STACK);
        for slot in top..self.top {
            self.stack[slot] = Value::Nil;
        }
        self.top = top;
    }

    /// Push a value.
    pub fn push(&mut self, value: Value) {
        self.grow_to(self.top + 1 + EXTRA_STACK);
        self.stack[self.top] = value;
        self.top += 1;
    }

    /// Pop the top value; nil on an empty stack.
    pub fn pop(&mut self) -> Value {
        if self.top == 0 {
            return Value::Nil;
        }
        self.top -= 1;
        std::mem::take(&mut self.stack[self.top])
    }

    /// Value in an absolute stack slot.
    pub fn stack_value(&self, slot: usize) -> Option<&Value> {
        self.stack.get(slot)
    }

    /// Overwrite an absolute stack slot, growing the stack when needed.
    pub fn set_stack_value(&mut self, slot: usize, value: Value) {
        self.grow_to(slot + 1);
        self.stack[slot] = value;
    }

    /// Make sure `n` slots above the top exist.
    pub fn ensure_stack(&mut self, n: usize) {
        self.grow_to(self.top + n + EXTRA_STACK);
    }

    fn grow_to(&mut self, len: usize) {
        if self.stack.len() < len {
            self.stack.resize(len, Value::Nil);
        }
    }

    // ------------------------------------------------------------------
    // Function objects
    // ------------------------------------------------------------------

    /// Register a script closure and return its function value.
    pub fn register_closure(&mut self, closure: Closure) -> Value {
        self.functions.push(FunctionObject::Script(closure));
        Value::Function(self.functions.len() - 1)
    }

    /// Register a native function and return its function value.
    pub fn register_native(&mut self, name: &str, upvalue_count: usize) -> Value {
        self.functions.push(FunctionObject::Native {
            name: name.to_string(),
            upvalue_count,
        });
        Value::Function(self.functions.len() - 1)
    }

    /// The function object a value refers to.
    pub fn function(&self, value: &Value) -> Option<&FunctionObject> {
        match value {
            Value::Function(id) => self.functions.get(*id),
            _ => None,
        }
    }

    /// The function object running in a frame.
    pub fn frame_function(&self, id: FrameId) -> Option<&FunctionObject> {
        let frame = self.frames.get(id)?;
        self.function(self.stack.get(frame.func)?)
    }

    /// The prototype running in a script frame.
    pub fn frame_proto(&self, id: FrameId) -> Option<Rc<Proto>> {
        self.frame_function(id)?.proto().cloned()
    }

    /// The closure running in a script frame.
    pub fn frame_closure(&self, id: FrameId) -> Option<&Closure> {
        self.frame_function(id)?.closure()
    }

    // ------------------------------------------------------------------
    // Frame chain
    // ------------------------------------------------------------------

    /// The frame currently executing.
    pub fn current_frame_id(&self) -> FrameId {
        self.frames.len() - 1
    }

    /// The frame currently executing.
    pub fn current_frame(&self) -> &CallFrame {
        &self.frames[self.current_frame_id()]
    }

    /// A frame by id.
    pub fn frame(&self, id: FrameId) -> Option<&CallFrame> {
        self.frames.get(id)
    }

    /// A frame by id, mutably (the interpreter saves its pc through this).
    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut CallFrame> {
        self.frames.get_mut(id)
    }

    /// Number of live frames, not counting the base sentinel.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Enter the script function in slot `func`; its arguments are the
    /// values between `func` and the top. Missing fixed parameters are
    /// filled with nil.
    ///
    /// The frame is fully built before it is linked into the chain.
    pub fn push_script_frame(&mut self, func: usize, status: CallStatus) -> SolResult<FrameId> {
        let proto = match self.stack.get(func).and_then(|v| self.function(v)) {
            Some(FunctionObject::Script(closure)) => closure.proto.clone(),
            _ => return Err(self.call_error(&ValueRef::Stack(func))),
        };
        let fixed = proto.num_params as usize;
        let frame_size = proto.max_stack_size as usize;
        let mut nargs = self.top.saturating_sub(func + 1);
        self.ensure_stack(frame_size.max(fixed));
        while nargs < fixed {
            self.push(Value::Nil);
            nargs += 1;
        }

        let mut frame = CallFrame::script(func, func + 1 + frame_size, Some(self.current_frame_id()));
        frame.status = status;
        self.grow_to(frame.top + EXTRA_STACK);
        self.frames.push(frame);
        Ok(self.current_frame_id())
    }

    /// Enter the native function in slot `func`, firing the call hook.
    pub fn push_native_frame(&mut self, func: usize) -> SolResult<FrameId> {
        if !matches!(
            self.stack.get(func).and_then(|v| self.function(v)),
            Some(FunctionObject::Native { .. })
        ) {
            return Err(self.call_error(&ValueRef::Stack(func)));
        }
        let frame = CallFrame::native(func, self.top + MIN_STACK, Some(self.current_frame_id()));
        self.grow_to(frame.top + EXTRA_STACK);
        self.frames.push(frame);
        if self.hook_mask.contains(HookMask::CALL) {
            let nargs = self.top.saturating_sub(func + 1);
            self.fire_hook(HookEvent::Call, None, 1, nargs);
        }
        Ok(self.current_frame_id())
    }

    /// Move the function and its fixed parameters above the arguments, so
    /// the extra arguments stay below the new frame base.
    pub fn adjust_varargs(&mut self, num_fixed: usize) {
        let id = self.current_frame_id();
        let func = self.frames[id].func;
        let actual = self.top.saturating_sub(func + 1);
        let extra = actual.saturating_sub(num_fixed);
        let frame_size = self.frame_proto(id).map_or(0, |p| p.max_stack_size as usize);
        self.ensure_stack(frame_size + 1);

        let function = self.stack[func].clone();
        self.push(function);
        for i in 1..=num_fixed {
            let param = std::mem::take(&mut self.stack[func + i]);
            self.push(param);
        }

        let frame = &mut self.frames[id];
        frame.func += actual + 1;
        frame.top += actual + 1;
        if let FrameKind::Script {
            extra_args,
            func_shift,
            ..
        } = &mut frame.kind
        {
            *extra_args = extra;
            *func_shift = actual + 1;
        }
        let top = frame.top;
        self.grow_to(top + EXTRA_STACK);
    }

    /// Return from the current frame with the top `nresults` values,
    /// firing the return hook. The results move to the function slot.
    /// Returns the frame that becomes current, or `None` at the base.
    pub fn pop_frame(&mut self, nresults: usize) -> Option<FrameId> {
        let id = self.current_frame_id();
        if id == BASE_FRAME {
            return None;
        }
        if !self.hook_mask.is_empty() {
            self.hook_return(nresults);
        }
        let frame = &self.frames[id];
        let shift = match frame.kind {
            FrameKind::Script { func_shift, .. } => func_shift,
            FrameKind::Native => 0,
        };
        let dest = frame.func - shift;
        let first = self.top.saturating_sub(nresults);
        for i in 0..nresults {
            let value = self.stack[first + i].clone();
            self.stack[dest + i] = value;
        }
        self.set_top(dest + nresults);
        self.frames.pop();
        Some(self.current_frame_id())
    }

    // ------------------------------------------------------------------
    // Status and error handler
    // ------------------------------------------------------------------

    /// Running or suspended.
    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    /// Whether hooks may fire (false while a hook runs).
    pub fn allow_hook(&self) -> bool {
        self.allow_hook
    }

    /// Install or remove the handler applied to uncaught error messages.
    pub fn set_error_handler(&mut self, handler: Option<ErrorHandler>) {
        self.error_handler = handler;
    }
}

impl fmt::Debug for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadState")
            .field("top", &self.top)
            .field("frames", &self.frames)
            .field("hook_mask", &self.hook_mask)
            .field("hook_count", &self.hook_count)
            .field("old_pc", &self.old_pc)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
