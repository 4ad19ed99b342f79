//! Arithmetic, bitwise, and comparison opcodes. Comparisons report their
//! condition back to the caller, which applies it to the instruction's
//! branch via `Interpreter::do_branch`.

use crate::error::{ZError, ZResult};
use crate::instruction::Instruction;
use crate::interpreter::ExecutionResult;
use crate::vm::VM;
use log::trace;

fn store(vm: &mut VM, inst: &Instruction, value: u16) -> ZResult<()> {
    if let Some(var) = inst.store_var {
        vm.write_variable(var, value)?;
    }
    Ok(())
}

pub fn execute(vm: &mut VM, inst: &Instruction, ops: &[u16]) -> ZResult<ExecutionResult> {
    match inst.name {
        "add" => {
            let r = (ops[0] as i16).wrapping_add(ops[1] as i16) as u16;
            store(vm, inst, r)?;
            Ok(ExecutionResult::Continue)
        }
        "sub" => {
            let r = (ops[0] as i16).wrapping_sub(ops[1] as i16) as u16;
            store(vm, inst, r)?;
            Ok(ExecutionResult::Continue)
        }
        "mul" => {
            let r = (ops[0] as i16).wrapping_mul(ops[1] as i16) as u16;
            store(vm, inst, r)?;
            Ok(ExecutionResult::Continue)
        }
        "div" => {
            if ops[1] == 0 {
                return Err(ZError::fatal("div: division by zero"));
            }
            let r = (ops[0] as i16).wrapping_div(ops[1] as i16) as u16;
            store(vm, inst, r)?;
            Ok(ExecutionResult::Continue)
        }
        "mod" => {
            if ops[1] == 0 {
                return Err(ZError::fatal("mod: division by zero"));
            }
            let r = (ops[0] as i16).wrapping_rem(ops[1] as i16) as u16;
            store(vm, inst, r)?;
            Ok(ExecutionResult::Continue)
        }
        "and" => {
            store(vm, inst, ops[0] & ops[1])?;
            Ok(ExecutionResult::Continue)
        }
        "or" => {
            store(vm, inst, ops[0] | ops[1])?;
            Ok(ExecutionResult::Continue)
        }
        "not" => {
            store(vm, inst, !ops[0])?;
            Ok(ExecutionResult::Continue)
        }
        "je" => {
            let condition = ops[1..].iter().any(|&o| o == ops[0]);
            trace!("je {:?} -> {condition}", ops);
            Ok(ExecutionResult::Condition(condition))
        }
        "jl" => Ok(ExecutionResult::Condition((ops[0] as i16) < (ops[1] as i16))),
        "jg" => Ok(ExecutionResult::Condition((ops[0] as i16) > (ops[1] as i16))),
        "jz" => Ok(ExecutionResult::Condition(ops[0] == 0)),
        "test" => Ok(ExecutionResult::Condition(ops[0] & ops[1] == ops[1])),
        _ => Err(ZError::fatal(format!("opcodes_math: unhandled opcode {}", inst.name))),
    }
}

pub fn handles(name: &str) -> bool {
    matches!(name, "add" | "sub" | "mul" | "div" | "mod" | "and" | "or" | "not" | "je" | "jl" | "jg" | "jz" | "test")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Form, OperandCount};
    use crate::memory::Memory;

    fn vm() -> VM {
        let mut b = vec![0u8; 0x100];
        b[0] = 3;
        b[0x1a] = 0x01;
        VM::new(Memory::new(b).unwrap())
    }

    fn inst(name: &'static str, store_var: Option<u8>) -> Instruction {
        Instruction {
            addr: 0,
            name,
            form: Form::Long,
            operand_count: OperandCount::Op2,
            operands: vec![],
            store_var,
            branch: None,
            text: None,
            size: 0,
        }
    }

    #[test]
    fn add_wraps_signed() {
        let mut v = vm();
        let i = inst("add", Some(16));
        execute(&mut v, &i, &[0x7FFF, 1]).unwrap();
        assert_eq!(v.read_global(16), 0x8000);
    }

    #[test]
    fn div_by_zero_is_fatal() {
        let mut v = vm();
        let i = inst("div", Some(16));
        assert!(execute(&mut v, &i, &[10, 0]).is_err());
    }

    #[test]
    fn je_checks_against_any_of_remaining_operands() {
        let mut v = vm();
        let i = inst("je", None);
        match execute(&mut v, &i, &[5, 1, 5, 9]).unwrap() {
            ExecutionResult::Condition(c) => assert!(c),
            _ => panic!("expected Condition"),
        }
    }
}
