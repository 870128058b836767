//! The fetch-decode-execute loop: one big match over [`Opcode`], charging a
//! fuel tick before executing each instruction's semantics.

use super::control::ArgBuffer;
use super::fuel::Fuel;
use super::{alu, convert, mem_ops};
use crate::call::CallStack;
use crate::consts::MAX_REG_COUNT;
use crate::error::{Trap, VmError};
use crate::host::{Caller, HostFunctionTable};
use crate::memory::LinearMemory;
use crate::module::{Function, Module};
use crate::opcode::Opcode;
use crate::types::Value;

fn decode(word: u32) -> (u8, u8, u8, u8) {
    let [op, dst, s1, s2] = word.to_le_bytes();
    (op, dst, s1, s2)
}

/// Resolve a branch's word-relative immediate against the word *after* the
/// immediate, per §4.2: "the relative offset is measured in words from the
/// word after the immediate."
fn branch_target(next_pc: u32, rel: i32) -> u32 {
    next_pc.wrapping_add(rel as u32)
}

struct Code<'a> {
    words: &'a [u32],
}

impl<'a> Code<'a> {
    fn word(&self, pc: u32) -> Result<u32, Trap> {
        self.words.get(pc as usize).copied().ok_or(Trap::Bounds)
    }
}

/// Run function `func_idx` to completion (return or trap), starting a fresh
/// call stack of `stack_capacity` frames.
#[allow(clippy::too_many_arguments)]
pub(crate) fn call(
    module: &Module,
    memory: &mut LinearMemory,
    globals: &mut [u64],
    host: &mut HostFunctionTable,
    fuel: &mut Fuel,
    stack_capacity: usize,
    func_idx: u32,
    params: &[Value],
) -> Result<Value, VmError> {
    let mut stack = CallStack::new(stack_capacity);
    let mut args = ArgBuffer::new();

    enter_function(&mut stack, module, func_idx, 0, params)?;

    loop {
        let frame_func = stack.current().expect("non-empty stack").func_idx();
        let body = match &module.functions()[frame_func as usize] {
            Function::Body(b) => b,
            Function::Import(_) => {
                return Err(VmError::Trap(Trap::Type));
            }
        };
        let code = Code { words: &body.code };
        let pc = stack.current().expect("non-empty stack").pc();

        if pc as usize >= body.code.len() {
            // Implicit fall-through: return R[0].
            let value = result_value(module, frame_func, stack.current().unwrap().registers().get(0));
            if let Some(done) = complete_frame(&mut stack, value)? {
                return Ok(done);
            }
            continue;
        }

        let word = code.word(pc)?;
        let (op_byte, dst, s1, s2) = decode(word);
        let opcode = Opcode::from_byte(op_byte).ok_or(VmError::Trap(Trap::BadOpcode(op_byte)))?;
        fuel.tick().map_err(VmError::Trap)?;

        let imm_words = opcode.immediate_words();
        let mut imm = [0u32; 2];
        for (i, slot) in imm.iter_mut().take(imm_words as usize).enumerate() {
            *slot = code.word(pc + 1 + i as u32)?;
        }
        let next_pc = pc + 1 + imm_words as u32;

        let frame = stack.current_mut().expect("non-empty stack");
        let outcome = execute(
            opcode,
            dst,
            s1,
            s2,
            imm,
            next_pc,
            module,
            memory,
            globals,
            host,
            &mut args,
            frame.registers_mut(),
        )?;

        match outcome {
            Outcome::Continue(pc) => {
                stack.current_mut().unwrap().set_pc(pc);
            }
            Outcome::Branch(pc) => {
                stack.current_mut().unwrap().set_pc(pc);
                args.reset();
            }
            Outcome::Return(bits) => {
                let value = result_value(module, frame_func, bits);
                if let Some(done) = complete_frame(&mut stack, value)? {
                    return Ok(done);
                }
            }
            Outcome::Call { target, dst } => {
                let (slots, count) = args.take();
                let target_func = module
                    .functions()
                    .get(target as usize)
                    .ok_or(VmError::Trap(Trap::Bounds))?;
                match target_func {
                    Function::Body(_) => {
                        enter_function(&mut stack, module, target, dst, &staged_params(module, target, &slots, count))?;
                    }
                    Function::Import(import_idx) => {
                        let result = dispatch_host(module, memory, host, *import_idx, &slots, count)?;
                        stack
                            .current_mut()
                            .unwrap()
                            .registers_mut()
                            .set(dst, result.to_bits());
                    }
                }
            }
        }
    }
}

fn staged_params(module: &Module, func_idx: u32, slots: &[u64; crate::consts::ARG_SLOTS], count: usize) -> Vec<Value> {
    let ty = module.function_type(func_idx).expect("validated at load");
    ty.params()
        .iter()
        .enumerate()
        .map(|(i, pty)| {
            let bits = if i < count { slots[i] } else { 0 };
            Value::from_bits(*pty, bits)
        })
        .collect()
}

fn enter_function(
    stack: &mut CallStack,
    module: &Module,
    func_idx: u32,
    return_reg: u8,
    params: &[Value],
) -> Result<(), VmError> {
    let declared = module.function_type(func_idx).expect("validated at load").params();
    if params.len() != declared.len() {
        return Err(VmError::Trap(Trap::Type));
    }
    let frame = stack.push(func_idx, return_reg).map_err(VmError::Trap)?;
    for (i, value) in params.iter().enumerate() {
        if i >= MAX_REG_COUNT {
            break;
        }
        frame.registers_mut().set(i as u8, value.to_bits());
    }
    Ok(())
}

/// Pop the current frame and either finish the whole call (stack now empty)
/// or stash the result into the caller's `return_reg`.
fn complete_frame(stack: &mut CallStack, value: Value) -> Result<Option<Value>, VmError> {
    let finished = stack.pop().expect("non-empty stack");
    match stack.current_mut() {
        None => Ok(Some(value)),
        Some(caller) => {
            caller.registers_mut().set(finished.return_reg(), value.to_bits());
            Ok(None)
        }
    }
}

fn result_value(module: &Module, func_idx: u32, bits: u64) -> Value {
    match module.function_type(func_idx).and_then(|t| t.result()) {
        Some(ty) => Value::from_bits(ty, bits),
        None => Value::Void,
    }
}

fn dispatch_host(
    module: &Module,
    memory: &mut LinearMemory,
    host: &mut HostFunctionTable,
    import_idx: u32,
    slots: &[u64; crate::consts::ARG_SLOTS],
    count: usize,
) -> Result<Value, VmError> {
    let import = &module.imports()[import_idx as usize];
    let index = host
        .resolve(&import.module, &import.name)
        .ok_or_else(|| VmError::NoImport {
            module: import.module.clone(),
            name: import.name.clone(),
        })?;
    let ty = &module.types()[import.type_idx as usize];
    let args: Vec<Value> = ty
        .params()
        .iter()
        .enumerate()
        .map(|(i, pty)| Value::from_bits(*pty, if i < count { slots[i] } else { 0 }))
        .collect();
    let mut caller = Caller::new(memory);
    host.call(index, &mut caller, &args)
        .map_err(|code| VmError::Trap(Trap::Host(code)))
}

enum Outcome {
    Continue(u32),
    Branch(u32),
    Return(u64),
    Call { target: u32, dst: u8 },
}

#[allow(clippy::too_many_arguments)]
fn execute(
    op: Opcode,
    dst: u8,
    s1: u8,
    s2: u8,
    imm: [u32; 2],
    next_pc: u32,
    module: &Module,
    memory: &mut LinearMemory,
    globals: &mut [u64],
    host: &mut HostFunctionTable,
    args: &mut ArgBuffer,
    regs: &mut crate::call::Registers,
) -> Result<Outcome, VmError> {
    use Opcode::*;

    let g32 = |r: &crate::call::Registers, i: u8| r.get(i) as u32;
    let gi32 = |r: &crate::call::Registers, i: u8| r.get(i) as u32 as i32;
    let gi64 = |r: &crate::call::Registers, i: u8| r.get(i) as i64;
    let gu64 = |r: &crate::call::Registers, i: u8| r.get(i);
    let gf32 = |r: &crate::call::Registers, i: u8| f32::from_bits(r.get(i) as u32);
    let gf64 = |r: &crate::call::Registers, i: u8| f64::from_bits(r.get(i));

    let _ = module;
    let _ = host;

    Ok(match op {
        Nop => Outcome::Continue(next_pc),
        Trap => return Err(VmError::Trap(crate::error::Trap::Explicit)),
        Ret => Outcome::Return(regs.get(0)),

        Jmp => Outcome::Branch(branch_target(next_pc, imm[0] as i32)),
        Jz => {
            if regs.get(s1) == 0 {
                Outcome::Branch(branch_target(next_pc, imm[0] as i32))
            } else {
                Outcome::Continue(next_pc)
            }
        }
        Jnz => {
            if regs.get(s1) != 0 {
                Outcome::Branch(branch_target(next_pc, imm[0] as i32))
            } else {
                Outcome::Continue(next_pc)
            }
        }
        Jlt => {
            if gi32(regs, s1) < gi32(regs, s2) {
                Outcome::Branch(branch_target(next_pc, imm[0] as i32))
            } else {
                Outcome::Continue(next_pc)
            }
        }
        Jle => {
            if gi32(regs, s1) <= gi32(regs, s2) {
                Outcome::Branch(branch_target(next_pc, imm[0] as i32))
            } else {
                Outcome::Continue(next_pc)
            }
        }

        Call => Outcome::Call { target: imm[0], dst },
        CallHost => Outcome::Call { target: imm[0], dst },
        Arg => {
            args.stage(dst, regs.get(s1)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }

        LdI32 => {
            regs.set(dst, imm[0] as i32 as u32 as u64);
            Outcome::Continue(next_pc)
        }
        LdI64 => {
            let bits = (imm[0] as u64) | ((imm[1] as u64) << 32);
            regs.set(dst, bits);
            Outcome::Continue(next_pc)
        }
        LdF32 => {
            regs.set(dst, imm[0] as u64);
            Outcome::Continue(next_pc)
        }
        LdF64 => {
            let bits = (imm[0] as u64) | ((imm[1] as u64) << 32);
            regs.set(dst, bits);
            Outcome::Continue(next_pc)
        }
        LdTrue => {
            regs.set(dst, 1);
            Outcome::Continue(next_pc)
        }
        LdFalse => {
            regs.set(dst, 0);
            Outcome::Continue(next_pc)
        }
        LdGlobal => {
            let idx = imm[0] as usize;
            let bits = *globals.get(idx).ok_or(VmError::Trap(crate::error::Trap::Bounds))?;
            regs.set(dst, bits);
            Outcome::Continue(next_pc)
        }
        StGlobal => {
            let idx = imm[0] as usize;
            let slot = globals.get_mut(idx).ok_or(VmError::Trap(crate::error::Trap::Bounds))?;
            *slot = regs.get(s1);
            Outcome::Continue(next_pc)
        }
        Mov => {
            regs.set(dst, regs.get(s1));
            Outcome::Continue(next_pc)
        }

        Add32 => wr32(regs, dst, alu::add32(gi32(regs, s1), gi32(regs, s2)), next_pc),
        Sub32 => wr32(regs, dst, alu::sub32(gi32(regs, s1), gi32(regs, s2)), next_pc),
        Mul32 => wr32(regs, dst, alu::mul32(gi32(regs, s1), gi32(regs, s2)), next_pc),
        Div32 => wr32(regs, dst, alu::div32(gi32(regs, s1), gi32(regs, s2)).map_err(VmError::Trap)?, next_pc),
        DivU32 => wru32(regs, dst, alu::divu32(g32(regs, s1), g32(regs, s2)).map_err(VmError::Trap)?, next_pc),
        Rem32 => wr32(regs, dst, alu::rem32(gi32(regs, s1), gi32(regs, s2)).map_err(VmError::Trap)?, next_pc),
        RemU32 => wru32(regs, dst, alu::remu32(g32(regs, s1), g32(regs, s2)).map_err(VmError::Trap)?, next_pc),
        Neg32 => wr32(regs, dst, alu::neg32(gi32(regs, s1)), next_pc),
        And32 => wru32(regs, dst, g32(regs, s1) & g32(regs, s2), next_pc),
        Or32 => wru32(regs, dst, g32(regs, s1) | g32(regs, s2), next_pc),
        Xor32 => wru32(regs, dst, g32(regs, s1) ^ g32(regs, s2), next_pc),
        Shl32 => wr32(regs, dst, alu::shl32(gi32(regs, s1), gi32(regs, s2)), next_pc),
        Shr32 => wr32(regs, dst, alu::shr32(gi32(regs, s1), gi32(regs, s2)), next_pc),
        ShrU32 => wru32(regs, dst, alu::shru32(g32(regs, s1), g32(regs, s2)), next_pc),
        Not32 => wru32(regs, dst, !g32(regs, s1), next_pc),
        Clz32 => wru32(regs, dst, alu::clz32(g32(regs, s1)), next_pc),
        Ctz32 => wru32(regs, dst, alu::ctz32(g32(regs, s1)), next_pc),
        Popcnt32 => wru32(regs, dst, alu::popcnt32(g32(regs, s1)), next_pc),

        Add64 => wr64(regs, dst, alu::add64(gi64(regs, s1), gi64(regs, s2)), next_pc),
        Sub64 => wr64(regs, dst, alu::sub64(gi64(regs, s1), gi64(regs, s2)), next_pc),
        Mul64 => wr64(regs, dst, alu::mul64(gi64(regs, s1), gi64(regs, s2)), next_pc),
        Div64 => wr64(regs, dst, alu::div64(gi64(regs, s1), gi64(regs, s2)).map_err(VmError::Trap)?, next_pc),
        DivU64 => wru64(regs, dst, alu::divu64(gu64(regs, s1), gu64(regs, s2)).map_err(VmError::Trap)?, next_pc),
        Rem64 => wr64(regs, dst, alu::rem64(gi64(regs, s1), gi64(regs, s2)).map_err(VmError::Trap)?, next_pc),
        RemU64 => wru64(regs, dst, alu::remu64(gu64(regs, s1), gu64(regs, s2)).map_err(VmError::Trap)?, next_pc),
        Neg64 => wr64(regs, dst, alu::neg64(gi64(regs, s1)), next_pc),
        And64 => wru64(regs, dst, gu64(regs, s1) & gu64(regs, s2), next_pc),
        Or64 => wru64(regs, dst, gu64(regs, s1) | gu64(regs, s2), next_pc),
        Xor64 => wru64(regs, dst, gu64(regs, s1) ^ gu64(regs, s2), next_pc),
        Shl64 => wr64(regs, dst, alu::shl64(gi64(regs, s1), gi64(regs, s2)), next_pc),
        Shr64 => wr64(regs, dst, alu::shr64(gi64(regs, s1), gi64(regs, s2)), next_pc),
        ShrU64 => wru64(regs, dst, alu::shru64(gu64(regs, s1), gu64(regs, s2)), next_pc),
        Not64 => wru64(regs, dst, !gu64(regs, s1), next_pc),
        Clz64 => wru64(regs, dst, alu::clz64(gu64(regs, s1)) as u64, next_pc),
        Ctz64 => wru64(regs, dst, alu::ctz64(gu64(regs, s1)) as u64, next_pc),
        Popcnt64 => wru64(regs, dst, alu::popcnt64(gu64(regs, s1)) as u64, next_pc),

        FAdd32 => wrf32(regs, dst, gf32(regs, s1) + gf32(regs, s2), next_pc),
        FSub32 => wrf32(regs, dst, gf32(regs, s1) - gf32(regs, s2), next_pc),
        FMul32 => wrf32(regs, dst, gf32(regs, s1) * gf32(regs, s2), next_pc),
        FDiv32 => wrf32(regs, dst, gf32(regs, s1) / gf32(regs, s2), next_pc),
        FAbs32 => wrf32(regs, dst, gf32(regs, s1).abs(), next_pc),
        FNeg32 => wrf32(regs, dst, -gf32(regs, s1), next_pc),
        FSqrt32 => wrf32(regs, dst, gf32(regs, s1).sqrt(), next_pc),
        FMin32 => wrf32(regs, dst, alu::fmin32(gf32(regs, s1), gf32(regs, s2)), next_pc),
        FMax32 => wrf32(regs, dst, alu::fmax32(gf32(regs, s1), gf32(regs, s2)), next_pc),
        FFloor32 => wrf32(regs, dst, gf32(regs, s1).floor(), next_pc),
        FCeil32 => wrf32(regs, dst, gf32(regs, s1).ceil(), next_pc),
        FRound32 => wrf32(regs, dst, gf32(regs, s1).round(), next_pc),

        FAdd64 => wrf64(regs, dst, gf64(regs, s1) + gf64(regs, s2), next_pc),
        FSub64 => wrf64(regs, dst, gf64(regs, s1) - gf64(regs, s2), next_pc),
        FMul64 => wrf64(regs, dst, gf64(regs, s1) * gf64(regs, s2), next_pc),
        FDiv64 => wrf64(regs, dst, gf64(regs, s1) / gf64(regs, s2), next_pc),
        FAbs64 => wrf64(regs, dst, gf64(regs, s1).abs(), next_pc),
        FNeg64 => wrf64(regs, dst, -gf64(regs, s1), next_pc),
        FSqrt64 => wrf64(regs, dst, gf64(regs, s1).sqrt(), next_pc),
        FMin64 => wrf64(regs, dst, alu::fmin64(gf64(regs, s1), gf64(regs, s2)), next_pc),
        FMax64 => wrf64(regs, dst, alu::fmax64(gf64(regs, s1), gf64(regs, s2)), next_pc),
        FFloor64 => wrf64(regs, dst, gf64(regs, s1).floor(), next_pc),
        FCeil64 => wrf64(regs, dst, gf64(regs, s1).ceil(), next_pc),
        FRound64 => wrf64(regs, dst, gf64(regs, s1).round(), next_pc),

        Eq32 => wrbool(regs, dst, gi32(regs, s1) == gi32(regs, s2), next_pc),
        Ne32 => wrbool(regs, dst, gi32(regs, s1) != gi32(regs, s2), next_pc),
        Lt32 => wrbool(regs, dst, gi32(regs, s1) < gi32(regs, s2), next_pc),
        Le32 => wrbool(regs, dst, gi32(regs, s1) <= gi32(regs, s2), next_pc),
        Gt32 => wrbool(regs, dst, gi32(regs, s1) > gi32(regs, s2), next_pc),
        Ge32 => wrbool(regs, dst, gi32(regs, s1) >= gi32(regs, s2), next_pc),
        LtU32 => wrbool(regs, dst, g32(regs, s1) < g32(regs, s2), next_pc),
        LeU32 => wrbool(regs, dst, g32(regs, s1) <= g32(regs, s2), next_pc),
        GtU32 => wrbool(regs, dst, g32(regs, s1) > g32(regs, s2), next_pc),
        GeU32 => wrbool(regs, dst, g32(regs, s1) >= g32(regs, s2), next_pc),

        Eq64 => wrbool(regs, dst, gi64(regs, s1) == gi64(regs, s2), next_pc),
        Ne64 => wrbool(regs, dst, gi64(regs, s1) != gi64(regs, s2), next_pc),
        Lt64 => wrbool(regs, dst, gi64(regs, s1) < gi64(regs, s2), next_pc),
        Le64 => wrbool(regs, dst, gi64(regs, s1) <= gi64(regs, s2), next_pc),
        Gt64 => wrbool(regs, dst, gi64(regs, s1) > gi64(regs, s2), next_pc),
        Ge64 => wrbool(regs, dst, gi64(regs, s1) >= gi64(regs, s2), next_pc),
        LtU64 => wrbool(regs, dst, gu64(regs, s1) < gu64(regs, s2), next_pc),
        LeU64 => wrbool(regs, dst, gu64(regs, s1) <= gu64(regs, s2), next_pc),
        GtU64 => wrbool(regs, dst, gu64(regs, s1) > gu64(regs, s2), next_pc),
        GeU64 => wrbool(regs, dst, gu64(regs, s1) >= gu64(regs, s2), next_pc),

        FEq32 => wrbool(regs, dst, gf32(regs, s1) == gf32(regs, s2), next_pc),
        FLt32 => wrbool(regs, dst, gf32(regs, s1) < gf32(regs, s2), next_pc),
        FEq64 => wrbool(regs, dst, gf64(regs, s1) == gf64(regs, s2), next_pc),
        FLt64 => wrbool(regs, dst, gf64(regs, s1) < gf64(regs, s2), next_pc),

        I32ToI64 => wr64(regs, dst, gi32(regs, s1) as i64, next_pc),
        U32ToI64 => wru64(regs, dst, g32(regs, s1) as u64, next_pc),
        I64ToI32 => wr32(regs, dst, gi64(regs, s1) as i32, next_pc),
        I32ToF32 => wrf32(regs, dst, gi32(regs, s1) as f32, next_pc),
        I32ToF64 => wrf64(regs, dst, gi32(regs, s1) as f64, next_pc),
        F32ToI32 => wr32(regs, dst, convert::f32_to_i32(gf32(regs, s1)), next_pc),
        F64ToI32 => wr32(regs, dst, convert::f64_to_i32(gf64(regs, s1)), next_pc),
        F32ToF64 => wrf64(regs, dst, gf32(regs, s1) as f64, next_pc),
        F64ToF32 => wrf32(regs, dst, gf64(regs, s1) as f32, next_pc),
        I64ToF64 => wrf64(regs, dst, gi64(regs, s1) as f64, next_pc),
        F64ToI64 => wr64(regs, dst, convert::f64_to_i64(gf64(regs, s1)), next_pc),
        BoolToI32 => wr32(regs, dst, (regs.get(s1) != 0) as i32, next_pc),

        Load8U32 => wru64(regs, dst, mem_ops::load8_u32(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load8S32 => wru64(regs, dst, mem_ops::load8_s32(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load16U32 => wru64(regs, dst, mem_ops::load16_u32(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load16S32 => wru64(regs, dst, mem_ops::load16_s32(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load32 => wru64(regs, dst, mem_ops::load32(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load8U64 => wru64(regs, dst, mem_ops::load8_u64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load8S64 => wru64(regs, dst, mem_ops::load8_s64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load16U64 => wru64(regs, dst, mem_ops::load16_u64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load16S64 => wru64(regs, dst, mem_ops::load16_s64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load32U64 => wru64(regs, dst, mem_ops::load32_u64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load32S64 => wru64(regs, dst, mem_ops::load32_s64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        Load64 => wru64(regs, dst, mem_ops::load64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        LoadF32 => wru64(regs, dst, mem_ops::load32(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),
        LoadF64 => wru64(regs, dst, mem_ops::load64(memory, g32(regs, s1), imm[0]).map_err(VmError::Trap)?, next_pc),

        Store8 => {
            mem_ops::store8(memory, g32(regs, s1), imm[0], regs.get(dst)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }
        Store16 => {
            mem_ops::store16(memory, g32(regs, s1), imm[0], regs.get(dst)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }
        Store32 => {
            mem_ops::store32(memory, g32(regs, s1), imm[0], regs.get(dst)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }
        Store64 => {
            mem_ops::store64(memory, g32(regs, s1), imm[0], regs.get(dst)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }
        StoreF32 => {
            mem_ops::store32(memory, g32(regs, s1), imm[0], regs.get(dst)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }
        StoreF64 => {
            mem_ops::store64(memory, g32(regs, s1), imm[0], regs.get(dst)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }

        MemSize => wru64(regs, dst, mem_ops::mem_size(memory) as u64, next_pc),
        MemGrow => wru64(regs, dst, mem_ops::mem_grow(memory, g32(regs, s1)) as u64, next_pc),
        MemCopy => {
            mem_ops::mem_copy(memory, g32(regs, dst), g32(regs, s1), g32(regs, s2)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }
        MemFill => {
            mem_ops::mem_fill(memory, g32(regs, dst), regs.get(s1) as u8, g32(regs, s2)).map_err(VmError::Trap)?;
            Outcome::Continue(next_pc)
        }
    })
}

fn wr32(regs: &mut crate::call::Registers, dst: u8, value: i32, next_pc: u32) -> Outcome {
    regs.set(dst, value as u32 as u64);
    Outcome::Continue(next_pc)
}

fn wru32(regs: &mut crate::call::Registers, dst: u8, value: u32, next_pc: u32) -> Outcome {
    regs.set(dst, value as u64);
    Outcome::Continue(next_pc)
}

fn wr64(regs: &mut crate::call::Registers, dst: u8, value: i64, next_pc: u32) -> Outcome {
    regs.set(dst, value as u64);
    Outcome::Continue(next_pc)
}

fn wru64(regs: &mut crate::call::Registers, dst: u8, value: u64, next_pc: u32) -> Outcome {
    regs.set(dst, value);
    Outcome::Continue(next_pc)
}

fn wrf32(regs: &mut crate::call::Registers, dst: u8, value: f32, next_pc: u32) -> Outcome {
    regs.set(dst, value.to_bits() as u64);
    Outcome::Continue(next_pc)
}

fn wrf64(regs: &mut crate::call::Registers, dst: u8, value: f64, next_pc: u32) -> Outcome {
    regs.set(dst, value.to_bits());
    Outcome::Continue(next_pc)
}

fn wrbool(regs: &mut crate::call::Registers, dst: u8, value: bool, next_pc: u32) -> Outcome {
    regs.set(dst, value as u64);
    Outcome::Continue(next_pc)
}
