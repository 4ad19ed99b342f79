//! Direct memory access, variable indirection, and the explicit stack ops.

use crate::error::{ZError, ZResult};
use crate::instruction::Instruction;
use crate::interpreter::ExecutionResult;
use crate::vm::VM;

fn store(vm: &mut VM, inst: &Instruction, value: u16) -> ZResult<()> {
    if let Some(var) = inst.store_var {
        vm.write_variable(var, value)?;
    }
    Ok(())
}

fn bounds_check(vm: &VM, addr: u32, opcode: &str) -> ZResult<()> {
    if addr as usize + 1 >= vm.memory.len() {
        return Err(ZError::fatal(format!("{opcode}: address {addr:#06x} out of bounds")));
    }
    Ok(())
}

pub fn execute(vm: &mut VM, inst: &Instruction, ops: &[u16]) -> ZResult<ExecutionResult> {
    match inst.name {
        "loadw" => {
            let addr = ops[0] as u32 + ops[1] as u32 * 2;
            bounds_check(vm, addr, "loadw")?;
            let v = vm.memory.word_get(addr);
            store(vm, inst, v)?;
            Ok(ExecutionResult::Continue)
        }
        "loadb" => {
            let addr = ops[0] as u32 + ops[1] as u32;
            if addr as usize >= vm.memory.len() {
                return Err(ZError::fatal(format!("loadb: address {addr:#06x} out of bounds")));
            }
            let v = vm.memory.byte_get(addr);
            store(vm, inst, v as u16)?;
            Ok(ExecutionResult::Continue)
        }
        "storew" => {
            let addr = ops[0] as u32 + ops[1] as u32 * 2;
            vm.memory.check_writable(addr, "storew")?;
            bounds_check(vm, addr, "storew")?;
            vm.memory.word_set(addr, ops[2]);
            Ok(ExecutionResult::Continue)
        }
        "storeb" => {
            let addr = ops[0] as u32 + ops[1] as u32;
            vm.memory.check_writable(addr, "storeb")?;
            if addr as usize >= vm.memory.len() {
                return Err(ZError::fatal(format!("storeb: address {addr:#06x} out of bounds")));
            }
            vm.memory.byte_set(addr, ops[2] as u8);
            Ok(ExecutionResult::Continue)
        }
        "store" => {
            let var = ops[0] as u8;
            vm.write_variable_replace(var, ops[1])?;
            Ok(ExecutionResult::Continue)
        }
        "load" => {
            let var = ops[0] as u8;
            let v = vm.read_variable_peek(var)?;
            store(vm, inst, v)?;
            Ok(ExecutionResult::Continue)
        }
        "push" => {
            vm.stack.push(ops[0])?;
            Ok(ExecutionResult::Continue)
        }
        "pull" => {
            let var = ops[0] as u8;
            let v = vm.stack.pop()?;
            vm.write_variable(var, v)?;
            Ok(ExecutionResult::Continue)
        }
        "inc" => {
            let var = ops[0] as u8;
            let v = (vm.read_variable(var)? as i16).wrapping_add(1) as u16;
            vm.write_variable(var, v)?;
            Ok(ExecutionResult::Continue)
        }
        "dec" => {
            let var = ops[0] as u8;
            let v = (vm.read_variable(var)? as i16).wrapping_sub(1) as u16;
            vm.write_variable(var, v)?;
            Ok(ExecutionResult::Continue)
        }
        "inc_chk" => {
            let var = ops[0] as u8;
            let v = (vm.read_variable(var)? as i16).wrapping_add(1);
            vm.write_variable(var, v as u16)?;
            Ok(ExecutionResult::Condition(v > ops[1] as i16))
        }
        "dec_chk" => {
            let var = ops[0] as u8;
            let v = (vm.read_variable(var)? as i16).wrapping_sub(1);
            vm.write_variable(var, v as u16)?;
            Ok(ExecutionResult::Condition(v < ops[1] as i16))
        }
        _ => Err(ZError::fatal(format!("opcodes_memory: unhandled opcode {}", inst.name))),
    }
}

pub fn handles(name: &str) -> bool {
    matches!(name, "loadw" | "loadb" | "storew" | "storeb" | "store" | "load" | "push" | "pull" | "inc" | "dec" | "inc_chk" | "dec_chk")
}
