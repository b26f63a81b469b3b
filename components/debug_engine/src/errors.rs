//! Runtime error construction.
//!
//! Every helper returns the finished [`SolError`]; callers raise it with
//! `return Err(..)`. Messages describe the offending value with whatever
//! name the resolver can recover, e.g.
//! `main.sol:3: attempt to index a nil value (global 'config')`.

use crate::context::ThreadState;
use crate::resolver::{describe, NameKind, VarName};
use core_types::{chunk_id, ErrorKind, SolError, SourcePosition, Value};

/// Where an operand of a failed operation lives.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRef {
    /// An absolute stack slot
    Stack(usize),
    /// An upvalue of the running closure
    Upvalue(usize),
    /// A value with no location (e.g. a temporary result)
    Detached(Value),
}

/// Prefix `msg` with `"source:line:"`, using `"?"` when the source is
/// unknown.
///
/// # Examples
///
/// ```
/// use debug_engine::add_info;
///
/// assert_eq!(add_info("boom", Some("@main.sol"), 3), "main.sol:3: boom");
/// assert_eq!(add_info("boom", None, 7), "?:7: boom");
/// ```
pub fn add_info(msg: &str, source: Option<&str>, line: i32) -> String {
    let source = source.map_or_else(|| "?".to_string(), chunk_id);
    format!("{}:{}: {}", source, line, msg)
}

fn format_var_info(name: Option<VarName>) -> String {
    match name {
        Some(VarName { kind, name }) => format!(" ({} '{}')", kind, name),
        None => String::new(),
    }
}

impl ThreadState {
    /// The value an operand refers to.
    pub fn value_of(&self, value: &ValueRef) -> Value {
        match value {
            ValueRef::Stack(slot) => self.stack.get(*slot).cloned().unwrap_or_default(),
            ValueRef::Upvalue(index) => self
                .frame_closure(self.current_frame_id())
                .and_then(|c| c.get_upvalue(*index))
                .map(|u| u.borrow().get(&self.stack))
                .unwrap_or_default(),
            ValueRef::Detached(value) => value.clone(),
        }
    }

    /// Name of an operand as seen by the running interpreted frame.
    fn operand_name(&self, value: &ValueRef) -> Option<VarName> {
        let id = self.current_frame_id();
        let frame = self.current_frame();
        if !frame.is_script() {
            return None;
        }
        let proto = self.frame_proto(id)?;
        match value {
            ValueRef::Upvalue(index) => {
                let desc = proto.upvalues.get(*index)?;
                Some(VarName::new(
                    NameKind::Upvalue,
                    desc.name.as_deref().unwrap_or("?"),
                ))
            }
            ValueRef::Stack(slot) if frame.base() <= *slot && *slot < frame.top => {
                describe(&proto, frame.current_pc()?, slot - frame.base())
            }
            _ => None,
        }
    }

    /// `" (kind 'name')"` for an operand with a known name, else empty.
    pub fn var_info(&self, value: &ValueRef) -> String {
        format_var_info(self.operand_name(value))
    }

    fn type_error_with(&self, value: &ValueRef, op: &str, extra: &str) -> SolError {
        let type_name = self.value_of(value).type_name();
        self.run_error(format!("attempt to {} a {} value{}", op, type_name, extra))
    }

    /// An operation `op` (e.g. "index") was applied to a value of the
    /// wrong type.
    pub fn type_error(&self, value: &ValueRef, op: &str) -> SolError {
        self.type_error_with(value, op, &self.var_info(value))
    }

    /// A non-callable value was called. The name comes from the calling
    /// instruction when possible.
    pub fn call_error(&self, value: &ValueRef) -> SolError {
        let extra = match self.func_name_from_call(self.current_frame_id()) {
            Some(name) => format_var_info(Some(name)),
            None => self.var_info(value),
        };
        self.type_error_with(value, "call", &extra)
    }

    /// A numeric `for` got a non-number `what` ("initial value", "limit",
    /// "step").
    pub fn for_error(&self, value: &ValueRef, what: &str) -> SolError {
        let type_name = self.value_of(value).type_name();
        self.run_error(format!(
            "bad 'for' {} (number expected, got {})",
            what, type_name
        ))
    }

    /// Concatenation failed; blames the first operand that is neither a
    /// string nor a number.
    pub fn concat_error(&self, p1: &ValueRef, p2: &ValueRef) -> SolError {
        let culprit = if self.value_of(p1).converts_to_string() {
            p2
        } else {
            p1
        };
        self.type_error(culprit, "concatenate")
    }

    /// Arithmetic or bitwise operation `msg` failed; blames the first
    /// operand when it is not a number.
    pub fn arith_error(&self, p1: &ValueRef, p2: &ValueRef, msg: &str) -> SolError {
        let culprit = if self.value_of(p1).is_number() { p2 } else { p1 };
        self.type_error(culprit, msg)
    }

    /// Both operands are numbers but one has no integer representation.
    pub fn to_int_error(&self, p1: &ValueRef, p2: &ValueRef) -> SolError {
        let culprit = if self.value_of(p1).to_integer_exact().is_none() {
            p1
        } else {
            p2
        };
        self.run_error(format!(
            "number{} has no integer representation",
            self.var_info(culprit)
        ))
    }

    /// Two values cannot be ordered.
    pub fn order_error(&self, p1: &ValueRef, p2: &ValueRef) -> SolError {
        let t1 = self.value_of(p1).type_name();
        let t2 = self.value_of(p2).type_name();
        if t1 == t2 {
            self.run_error(format!("attempt to compare two {} values", t1))
        } else {
            self.run_error(format!("attempt to compare {} with {}", t1, t2))
        }
    }

    /// A runtime error. Inside interpreted code the message is prefixed
    /// with the current source position; the traceback is attached and
    /// the message goes through the error handler.
    pub fn run_error(&self, msg: impl Into<String>) -> SolError {
        let msg = msg.into();
        let id = self.current_frame_id();
        let frame = self.current_frame();
        let mut position = None;
        let message = match (frame.is_script(), self.frame_proto(id)) {
            (true, Some(proto)) => {
                let line = frame
                    .current_pc()
                    .and_then(|pc| proto.line_for(pc))
                    .unwrap_or(-1);
                let source = proto.source.as_deref();
                position = Some(SourcePosition {
                    source: source.map_or_else(|| "?".to_string(), chunk_id),
                    line,
                });
                add_info(&msg, source, line)
            }
            _ => msg,
        };
        let mut error = SolError::runtime(message).with_stack(self.traceback(0));
        if let Some(position) = position {
            error = error.with_position(position);
        }
        self.error_message(error)
    }

    /// Pass an error through the installed error handler, if any. A
    /// failing handler turns the error into an error-handler error.
    pub fn error_message(&self, error: SolError) -> SolError {
        let Some(handler) = &self.error_handler else {
            return error;
        };
        match handler(self, &error.message) {
            Ok(message) => SolError { message, ..error },
            Err(_) => SolError::new(ErrorKind::ErrorHandler, "error in error handling")
                .with_stack(error.stack),
        }
    }
}
