//! Activation records.
//!
//! Frames live in an arena owned by [`ThreadState`](crate::ThreadState)
//! and are linked newest-first through `previous`. Slot 0 of the arena is
//! the base sentinel, which is never reported as a stack level.

/// Index of a frame in the thread's frame arena.
pub type FrameId = usize;

/// Id of the base sentinel frame.
pub const BASE_FRAME: FrameId = 0;

/// Call-status flags of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CallStatus(u16);

impl CallStatus {
    /// The frame is running a debug hook
    pub const HOOKED: CallStatus = CallStatus(1 << 0);
    /// The frame was entered through a tail call
    pub const TAIL: CallStatus = CallStatus(1 << 1);
    /// The last hook called from this frame yielded
    pub const HOOK_YIELD: CallStatus = CallStatus(1 << 2);
    /// The frame is calling a finalizer
    pub const FIN: CallStatus = CallStatus(1 << 3);
    /// The frame holds transfer information for a hook
    pub const TRANSFER: CallStatus = CallStatus(1 << 4);

    /// No flags.
    pub const fn empty() -> Self {
        CallStatus(0)
    }

    /// Whether all flags in `other` are set.
    pub fn contains(self, other: CallStatus) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the flags in `other`.
    pub fn insert(&mut self, other: CallStatus) {
        self.0 |= other.0;
    }

    /// Clear the flags in `other`.
    pub fn remove(&mut self, other: CallStatus) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for CallStatus {
    type Output = CallStatus;

    fn bitor(self, rhs: CallStatus) -> CallStatus {
        CallStatus(self.0 | rhs.0)
    }
}

/// Values moved across a call boundary, reported to hooks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Index of the first transferred value, relative to the function slot
    pub first: usize,
    /// Number of transferred values
    pub count: usize,
}

/// What kind of code a frame runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Interpreted bytecode
    Script {
        /// Index of the next instruction to execute
        saved_pc: usize,
        /// Re-check hooks before every instruction
        trap: bool,
        /// Extra variadic arguments stored below the frame base
        extra_args: usize,
        /// How far the function slot moved up when varargs were adjusted
        func_shift: usize,
    },
    /// A native function
    Native,
}

/// Call frame representing one in-progress call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Stack slot holding the called function; registers start right after
    pub func: usize,
    /// Stack limit of this frame
    pub top: usize,
    /// The calling frame
    pub previous: Option<FrameId>,
    /// Call-status flags
    pub status: CallStatus,
    /// Script or native state
    pub kind: FrameKind,
    /// Transfer information, valid while `TRANSFER` is set
    pub transfer: Transfer,
}

impl CallFrame {
    /// A frame for interpreted code, about to run its first instruction.
    pub fn script(func: usize, top: usize, previous: Option<FrameId>) -> Self {
        Self {
            func,
            top,
            previous,
            status: CallStatus::empty(),
            kind: FrameKind::Script {
                saved_pc: 0,
                trap: false,
                extra_args: 0,
                func_shift: 0,
            },
            transfer: Transfer::default(),
        }
    }

    /// A frame for a native function.
    pub fn native(func: usize, top: usize, previous: Option<FrameId>) -> Self {
        Self {
            func,
            top,
            previous,
            status: CallStatus::empty(),
            kind: FrameKind::Native,
            transfer: Transfer::default(),
        }
    }

    /// First register of the frame.
    pub fn base(&self) -> usize {
        self.func + 1
    }

    /// Whether the frame runs interpreted code.
    pub fn is_script(&self) -> bool {
        matches!(self.kind, FrameKind::Script { .. })
    }

    /// The saved program counter (next instruction), for script frames.
    pub fn saved_pc(&self) -> Option<usize> {
        match self.kind {
            FrameKind::Script { saved_pc, .. } => Some(saved_pc),
            FrameKind::Native => None,
        }
    }

    /// Index of the instruction being executed, for script frames.
    pub fn current_pc(&self) -> Option<usize> {
        self.saved_pc().map(|pc| pc.saturating_sub(1))
    }

    /// Record the program counter. No effect on native frames.
    pub fn set_saved_pc(&mut self, pc: usize) {
        if let FrameKind::Script { saved_pc, .. } = &mut self.kind {
            *saved_pc = pc;
        }
    }

    /// Whether hooks are re-checked on every instruction.
    pub fn trap(&self) -> bool {
        matches!(self.kind, FrameKind::Script { trap: true, .. })
    }

    /// Arm or disarm the trap. No effect on native frames.
    pub fn set_trap(&mut self, on: bool) {
        if let FrameKind::Script { trap, .. } = &mut self.kind {
            *trap = on;
        }
    }

    /// Number of extra variadic arguments.
    pub fn extra_args(&self) -> usize {
        match self.kind {
            FrameKind::Script { extra_args, .. } => extra_args,
            FrameKind::Native => 0,
        }
    }

    /// Whether the frame was entered through a tail call.
    pub fn is_tail_call(&self) -> bool {
        self.status.contains(CallStatus::TAIL)
    }
}
