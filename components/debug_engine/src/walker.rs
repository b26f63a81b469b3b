//! Call-stack walker: stack levels, locals and function descriptions.

use crate::call_frame::{CallStatus, FrameId, BASE_FRAME};
use crate::closure::FunctionObject;
use crate::context::ThreadState;
use crate::resolver::VarName;
use core_types::{chunk_id, StackFrame, Value};
use serde::Serialize;
use std::collections::BTreeSet;

/// What kind of function a description is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    /// A native function
    Native,
    /// The main chunk of a compiled source
    Main,
    /// Any other interpreted function
    Interpreted,
}

/// Description of a function, optionally as seen from a live frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuncInfo {
    /// Source identifier (`"=[C]"` for native functions)
    pub source: String,
    /// Display form of `source`
    pub short_src: String,
    /// Line where the definition starts (-1 for native functions)
    pub line_defined: i32,
    /// Line where the definition ends (-1 for native functions)
    pub last_line_defined: i32,
    /// Native, main chunk or interpreted
    pub what: FunctionKind,
    /// Line being executed, for live interpreted frames with line info
    pub current_line: Option<i32>,
    /// Number of upvalues
    pub upvalue_count: usize,
    /// Number of fixed parameters
    pub param_count: usize,
    /// Whether the function takes variadic arguments
    pub is_vararg: bool,
    /// Whether the frame was entered through a tail call
    pub is_tail_call: bool,
    /// First value transferred by the current call or return event
    pub first_transfer: usize,
    /// Number of values transferred
    pub transfer_count: usize,
    /// How the caller refers to the function, when known
    pub name: Option<VarName>,
}

impl FuncInfo {
    fn of_function(function: Option<&FunctionObject>) -> Self {
        let native = FuncInfo {
            source: "=[C]".to_string(),
            short_src: "[C]".to_string(),
            line_defined: -1,
            last_line_defined: -1,
            what: FunctionKind::Native,
            current_line: None,
            upvalue_count: 0,
            param_count: 0,
            is_vararg: true,
            is_tail_call: false,
            first_transfer: 0,
            transfer_count: 0,
            name: None,
        };
        match function {
            Some(FunctionObject::Script(closure)) => {
                let proto = &closure.proto;
                let source = proto.source.clone().unwrap_or_else(|| "=?".to_string());
                FuncInfo {
                    short_src: chunk_id(&source),
                    source,
                    line_defined: proto.line_defined,
                    last_line_defined: proto.last_line_defined,
                    what: if proto.is_main() {
                        FunctionKind::Main
                    } else {
                        FunctionKind::Interpreted
                    },
                    upvalue_count: closure.upvalue_count(),
                    param_count: proto.num_params as usize,
                    is_vararg: proto.is_vararg,
                    ..native
                }
            }
            Some(FunctionObject::Native { upvalue_count, .. }) => FuncInfo {
                upvalue_count: *upvalue_count,
                ..native
            },
            None => native,
        }
    }
}

impl ThreadState {
    /// The frame `level` steps up the stack; level 0 is the running frame.
    ///
    /// # Examples
    ///
    /// ```
    /// use debug_engine::ThreadState;
    ///
    /// let state = ThreadState::new();
    /// // the base sentinel is not a level
    /// assert_eq!(state.frame_at(0), None);
    /// assert_eq!(state.frame_at(-1), None);
    /// ```
    pub fn frame_at(&self, level: isize) -> Option<FrameId> {
        if level < 0 {
            return None;
        }
        let mut id = self.current_frame_id();
        let mut level = level;
        while level > 0 && id != BASE_FRAME {
            id = self.frames[id].previous?;
            level -= 1;
        }
        (level == 0 && id != BASE_FRAME).then_some(id)
    }

    fn find_vararg(&self, id: FrameId, n: i32) -> Option<(String, usize)> {
        let frame = &self.frames[id];
        let is_vararg = self.frame_proto(id).is_some_and(|p| p.is_vararg);
        let extra = frame.extra_args() as i64;
        if is_vararg && n as i64 >= -extra {
            // extra arguments sit right below the function slot
            let slot = frame.func as i64 - extra - (n as i64 + 1);
            return Some(("(vararg)".to_string(), slot as usize));
        }
        None
    }

    /// Name and stack slot of local `n` of a frame.
    ///
    /// Positive `n` counts active locals from 1, falling back to a generic
    /// temporary name for any slot inside the frame. Negative `n` counts
    /// the extra arguments of a vararg frame.
    pub fn local_name(&self, id: FrameId, n: i32) -> Option<(String, usize)> {
        let frame = self.frames.get(id)?;
        let base = frame.base();
        let mut name = None;
        if frame.is_script() {
            if n < 0 {
                return self.find_vararg(id, n);
            }
            let proto = self.frame_proto(id)?;
            let pc = frame.current_pc().unwrap_or(0);
            name = proto.local_name(n as usize, pc).map(str::to_string);
        }
        let name = match name {
            Some(name) => name,
            None => {
                let limit = if id == self.current_frame_id() {
                    self.top
                } else {
                    self.frames.get(id + 1).map_or(self.top, |next| next.func)
                };
                if n > 0 && limit as i64 - base as i64 >= n as i64 {
                    if frame.is_script() {
                        "(temporary)".to_string()
                    } else {
                        "(native temporary)".to_string()
                    }
                } else {
                    return None;
                }
            }
        };
        Some((name, base + n as usize - 1))
    }

    /// Push the value of local `n` of a frame and return its name.
    pub fn read_local(&mut self, id: FrameId, n: i32) -> Option<String> {
        let (name, slot) = self.local_name(id, n)?;
        let value = self.stack.get(slot).cloned().unwrap_or_default();
        self.push(value);
        Some(name)
    }

    /// Pop the top value into local `n` of a frame and return its name.
    /// Nothing is popped when there is no such local.
    pub fn write_local(&mut self, id: FrameId, n: i32) -> Option<String> {
        let (name, slot) = self.local_name(id, n)?;
        let value = self.pop();
        self.set_stack_value(slot, value);
        Some(name)
    }

    /// Name of parameter `n` of a function that is not running.
    pub fn parameter_name(&self, function: &Value, n: usize) -> Option<String> {
        let proto = self.function(function)?.proto()?;
        proto.local_name(n, 0).map(str::to_string)
    }

    /// Describe a function value without any frame.
    pub fn describe_function(&self, function: &Value) -> FuncInfo {
        FuncInfo::of_function(self.function(function))
    }

    /// Describe the function running in a frame, including its current
    /// line, call-site name and transfer information.
    pub fn function_description(&self, id: FrameId) -> Option<FuncInfo> {
        let frame = self.frames.get(id)?;
        let mut info = FuncInfo::of_function(self.frame_function(id));
        if let (Some(proto), Some(pc)) = (self.frame_proto(id), frame.current_pc()) {
            info.current_line = proto.line_for(pc);
        }
        info.is_tail_call = frame.is_tail_call();
        if frame.status.contains(CallStatus::TRANSFER) {
            info.first_transfer = frame.transfer.first;
            info.transfer_count = frame.transfer.count;
        }
        if !frame.is_tail_call() {
            info.name = frame.previous.and_then(|caller| self.func_name_from_call(caller));
        }
        Some(info)
    }

    /// Every line holding an instruction of a script function; `None` for
    /// native functions.
    pub fn enumerate_valid_lines(&self, function: &Value) -> Option<BTreeSet<i32>> {
        let proto = self.function(function)?.proto()?;
        Some(proto.valid_lines().unwrap_or_default())
    }

    /// Traceback entries from stack level `level` down to the outermost
    /// frame, innermost first.
    pub fn traceback(&self, level: isize) -> Vec<StackFrame> {
        let mut entries = Vec::new();
        let mut next = self.frame_at(level);
        while let Some(id) = next {
            if id == BASE_FRAME {
                break;
            }
            if let Some(info) = self.function_description(id) {
                let function_name = match (&info.name, info.what) {
                    (Some(name), _) => Some(name.name.clone()),
                    (None, FunctionKind::Main) => Some("main chunk".to_string()),
                    (None, _) => None,
                };
                entries.push(StackFrame {
                    function_name,
                    source: info.short_src,
                    line: info.current_line,
                    is_tail_call: info.is_tail_call,
                });
            }
            next = self.frames[id].previous;
        }
        entries
    }
}
