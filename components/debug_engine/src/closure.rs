//! Function objects as seen by the debug engine.
//!
//! Only the fields introspection reads are modelled: a script closure is a
//! prototype plus its captured upvalues, a native function is a name.

use bytecode_system::Proto;
use core_types::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// A captured variable.
///
/// Open while the variable still lives in a stack slot, closed once its
/// scope ended and the value moved into shared storage.
#[derive(Debug, Clone)]
pub enum Upvalue {
    /// Variable still lives on the stack at the given slot
    Open {
        /// Absolute stack slot
        stack_index: usize,
    },
    /// Variable was closed over
    Closed {
        /// Shared storage
        value: Rc<RefCell<Value>>,
    },
}

impl Upvalue {
    /// An upvalue aliasing a stack slot.
    pub fn new_open(stack_index: usize) -> Self {
        Upvalue::Open { stack_index }
    }

    /// An upvalue owning its value.
    pub fn new_closed(value: Value) -> Self {
        Upvalue::Closed {
            value: Rc::new(RefCell::new(value)),
        }
    }

    /// Move the value off the stack.
    pub fn close(&mut self, stack: &[Value]) {
        if let Upvalue::Open { stack_index } = *self {
            let value = stack.get(stack_index).cloned().unwrap_or_default();
            *self = Upvalue::new_closed(value);
        }
    }

    /// Read the current value.
    pub fn get(&self, stack: &[Value]) -> Value {
        match self {
            Upvalue::Open { stack_index } => stack.get(*stack_index).cloned().unwrap_or_default(),
            Upvalue::Closed { value } => value.borrow().clone(),
        }
    }

    /// Write a new value.
    pub fn set(&self, new_value: Value, stack: &mut [Value]) {
        match self {
            Upvalue::Open { stack_index } => {
                if let Some(slot) = stack.get_mut(*stack_index) {
                    *slot = new_value;
                }
            }
            Upvalue::Closed { value } => *value.borrow_mut() = new_value,
        }
    }

    /// Whether the variable still lives on the stack.
    pub fn is_open(&self) -> bool {
        matches!(self, Upvalue::Open { .. })
    }
}

/// A shared upvalue.
pub type UpvalueHandle = Rc<RefCell<Upvalue>>;

/// Wrap an upvalue for sharing between closures.
pub fn new_upvalue_handle(upvalue: Upvalue) -> UpvalueHandle {
    Rc::new(RefCell::new(upvalue))
}

/// An interpreted function: prototype plus captured environment.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The compiled function
    pub proto: Rc<Proto>,
    /// Captured variables, one per upvalue descriptor of `proto`
    pub upvalues: Vec<UpvalueHandle>,
}

impl Closure {
    /// A closure over `proto` with the given upvalues.
    pub fn new(proto: Rc<Proto>, upvalues: Vec<UpvalueHandle>) -> Self {
        Self { proto, upvalues }
    }

    /// A closure whose upvalues are all closed and nil.
    pub fn with_nil_upvalues(proto: Rc<Proto>) -> Self {
        let upvalues = (0..proto.upvalues.len())
            .map(|_| new_upvalue_handle(Upvalue::new_closed(Value::Nil)))
            .collect();
        Self { proto, upvalues }
    }

    /// Number of captured variables.
    pub fn upvalue_count(&self) -> usize {
        self.upvalues.len()
    }

    /// A captured variable by index.
    pub fn get_upvalue(&self, index: usize) -> Option<&UpvalueHandle> {
        self.upvalues.get(index)
    }
}

/// A function value stored in the thread's function arena.
#[derive(Debug, Clone)]
pub enum FunctionObject {
    /// Interpreted function
    Script(Closure),
    /// Native function, known only by the name it was registered with
    Native {
        /// Registration name
        name: String,
        /// Number of captured values
        upvalue_count: usize,
    },
}

impl FunctionObject {
    /// The prototype of a script function.
    pub fn proto(&self) -> Option<&Rc<Proto>> {
        match self {
            FunctionObject::Script(closure) => Some(&closure.proto),
            FunctionObject::Native { .. } => None,
        }
    }

    /// The closure of a script function.
    pub fn closure(&self) -> Option<&Closure> {
        match self {
            FunctionObject::Script(closure) => Some(closure),
            FunctionObject::Native { .. } => None,
        }
    }
}
