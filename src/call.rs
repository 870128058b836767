//! Call stack: a bounded array of frames, each with a fixed register window.

use crate::consts::REGISTER_WINDOW;
use crate::error::Trap;

/// The fixed-size array of typed register slots local to one function
/// activation, stored as raw bit patterns — see [`crate::types::Value`] for
/// where the tag is materialized.
#[derive(Debug, Clone)]
pub struct Registers([u64; REGISTER_WINDOW]);

impl Registers {
    fn zeroed() -> Self {
        Self([0; REGISTER_WINDOW])
    }

    /// Read a register by index.
    pub fn get(&self, index: u8) -> u64 {
        self.0[index as usize]
    }

    /// Write a register by index.
    pub fn set(&mut self, index: u8, value: u64) {
        self.0[index as usize] = value;
    }
}

/// One function activation: which function is executing, where in its code
/// the program counter sits (in words), and its register window.
#[derive(Debug, Clone)]
pub struct Frame {
    func_idx: u32,
    pc: u32,
    registers: Registers,
    return_reg: u8,
}

impl Frame {
    fn new(func_idx: u32, return_reg: u8) -> Self {
        Self {
            func_idx,
            pc: 0,
            registers: Registers::zeroed(),
            return_reg,
        }
    }

    /// Index of the function this frame is executing.
    pub const fn func_idx(&self) -> u32 {
        self.func_idx
    }

    /// The caller's register index that should receive this frame's return
    /// value once it returns (meaningless for the outermost frame, whose
    /// result instead becomes the `vm_call` result).
    pub const fn return_reg(&self) -> u8 {
        self.return_reg
    }

    /// Program counter, measured in instruction words.
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Set the program counter.
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// Advance the program counter by `words`.
    pub fn advance_pc(&mut self, words: u32) {
        self.pc = self.pc.wrapping_add(words);
    }

    /// This activation's register window.
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// This activation's register window, mutably.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }
}

/// The VM's bounded call stack.
///
/// Capacity is fixed at construction (`Config::stack_size`, default 512);
/// entering a function beyond that depth traps with `StackOverflow` instead
/// of growing, giving the host a hard, predictable ceiling on guest
/// recursion.
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<Frame>,
    capacity: usize,
}

impl CallStack {
    /// Create an empty call stack with room for `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of frames currently on the stack.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a new activation of `func_idx`, failing with `StackOverflow` if
    /// the configured depth limit is already reached. `return_reg` names the
    /// caller's register that receives this frame's eventual return value.
    pub fn push(&mut self, func_idx: u32, return_reg: u8) -> Result<&mut Frame, Trap> {
        if self.frames.len() >= self.capacity {
            return Err(Trap::StackOverflow);
        }
        self.frames.push(Frame::new(func_idx, return_reg));
        Ok(self.frames.last_mut().expect("just pushed"))
    }

    /// Pop the topmost activation.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// The currently executing activation.
    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The currently executing activation, mutably.
    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Clear every frame. Used when a call chain aborts on a trap so the
    /// next `vm_call` starts from an empty stack, per the "stack discipline"
    /// invariant: `frame_count` before and after any completed `vm_call` is
    /// equal.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
