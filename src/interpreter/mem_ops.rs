//! Bounds-checked load/store helpers over [`LinearMemory`], plus the memory
//! system ops (`MEM_SIZE`, `MEM_GROW`, `MEM_COPY`, `MEM_FILL`).
//!
//! Loads return the value already sign- or zero-extended into a `u64`, ready
//! to write straight into a register; [`super::dispatch`] is responsible for
//! choosing which of these to call per opcode.

use crate::consts::PAGE_SIZE;
use crate::error::Trap;
use crate::memory::LinearMemory;

fn addr(base: u32, offset: u32) -> Result<u64, Trap> {
    Ok(base as u64 + offset as u64)
}

pub fn load8_u32(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    Ok(mem.read(a, 1)?[0] as u64)
}

pub fn load8_s32(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    Ok(mem.read(a, 1)?[0] as i8 as i32 as u32 as u64)
}

pub fn load16_u32(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    let b = mem.read(a, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]) as u64)
}

pub fn load16_s32(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    let b = mem.read(a, 2)?;
    Ok(i16::from_le_bytes([b[0], b[1]]) as i32 as u32 as u64)
}

pub fn load32(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    let b = mem.read(a, 4)?;
    Ok(u32::from_le_bytes(b.try_into().unwrap()) as u64)
}

pub fn load8_u64(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    load8_u32(mem, base, offset)
}

pub fn load8_s64(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    Ok(mem.read(a, 1)?[0] as i8 as i64 as u64)
}

pub fn load16_u64(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    load16_u32(mem, base, offset)
}

pub fn load16_s64(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    let b = mem.read(a, 2)?;
    Ok(i16::from_le_bytes([b[0], b[1]]) as i64 as u64)
}

pub fn load32_u64(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    load32(mem, base, offset)
}

pub fn load32_s64(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    let b = mem.read(a, 4)?;
    Ok(i32::from_le_bytes(b.try_into().unwrap()) as i64 as u64)
}

pub fn load64(mem: &LinearMemory, base: u32, offset: u32) -> Result<u64, Trap> {
    let a = addr(base, offset)?;
    let b = mem.read(a, 8)?;
    Ok(u64::from_le_bytes(b.try_into().unwrap()))
}

pub fn store8(mem: &mut LinearMemory, base: u32, offset: u32, value: u64) -> Result<(), Trap> {
    let a = addr(base, offset)?;
    mem.write(a, &[(value & 0xff) as u8])
}

pub fn store16(mem: &mut LinearMemory, base: u32, offset: u32, value: u64) -> Result<(), Trap> {
    let a = addr(base, offset)?;
    mem.write(a, &(value as u16).to_le_bytes())
}

pub fn store32(mem: &mut LinearMemory, base: u32, offset: u32, value: u64) -> Result<(), Trap> {
    let a = addr(base, offset)?;
    mem.write(a, &(value as u32).to_le_bytes())
}

pub fn store64(mem: &mut LinearMemory, base: u32, offset: u32, value: u64) -> Result<(), Trap> {
    let a = addr(base, offset)?;
    mem.write(a, &value.to_le_bytes())
}

/// Current memory size, in pages.
pub fn mem_size(mem: &LinearMemory) -> u32 {
    mem.pages()
}

/// Grow by `delta` pages, returning the previous page count or `u32::MAX`
/// (the bit pattern of `-1i32`) if the grow would exceed `memory_max`.
pub fn mem_grow(mem: &mut LinearMemory, delta: u32) -> u32 {
    mem.grow(delta).unwrap_or(u32::MAX)
}

pub fn mem_copy(mem: &mut LinearMemory, dst: u32, src: u32, len: u32) -> Result<(), Trap> {
    mem.copy_within(dst as u64, src as u64, len as u64)
}

pub fn mem_fill(mem: &mut LinearMemory, dst: u32, value: u8, len: u32) -> Result<(), Trap> {
    mem.fill(dst as u64, len as u64, value)
}

/// Bytes per page, re-exported for callers computing addresses.
pub const fn page_size() -> u32 {
    PAGE_SIZE
}
