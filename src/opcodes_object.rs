//! Object tree and property opcodes.

use crate::error::{ZError, ZResult};
use crate::instruction::Instruction;
use crate::interpreter::ExecutionResult;
use crate::object;
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
        "jin" => {
            let child = ops[0];
            let parent = object::parent(&vm.memory, child)?;
            Ok(ExecutionResult::Condition(parent == ops[1]))
        }
        "test_attr" => {
            let has = object::test_attr(&vm.memory, ops[0], ops[1])?;
            Ok(ExecutionResult::Condition(has))
        }
        "set_attr" => {
            object::set_attr(&mut vm.memory, ops[0], ops[1])?;
            Ok(ExecutionResult::Continue)
        }
        "clear_attr" => {
            object::clear_attr(&mut vm.memory, ops[0], ops[1])?;
            Ok(ExecutionResult::Continue)
        }
        "insert_obj" => {
            object::insert_obj(&mut vm.memory, ops[0], ops[1])?;
            Ok(ExecutionResult::Continue)
        }
        "remove_obj" => {
            object::remove_obj(&mut vm.memory, ops[0])?;
            Ok(ExecutionResult::Continue)
        }
        "get_sibling" => {
            let s = object::sibling(&vm.memory, ops[0])?;
            store(vm, inst, s)?;
            Ok(ExecutionResult::Condition(s != 0))
        }
        "get_child" => {
            let c = object::child(&vm.memory, ops[0])?;
            store(vm, inst, c)?;
            Ok(ExecutionResult::Condition(c != 0))
        }
        "get_parent" => {
            let p = object::parent(&vm.memory, ops[0])?;
            store(vm, inst, p)?;
            Ok(ExecutionResult::Continue)
        }
        "get_prop" => {
            let v = object::get_prop(&vm.memory, ops[0], ops[1])?;
            store(vm, inst, v)?;
            Ok(ExecutionResult::Continue)
        }
        "put_prop" => {
            object::put_prop(&mut vm.memory, ops[0], ops[1], ops[2])?;
            Ok(ExecutionResult::Continue)
        }
        "get_prop_addr" => {
            let a = object::get_prop_addr(&vm.memory, ops[0], ops[1])?;
            store(vm, inst, a)?;
            Ok(ExecutionResult::Continue)
        }
        "get_prop_len" => {
            let len = object::get_prop_len(&vm.memory, ops[0]);
            store(vm, inst, len as u16)?;
            Ok(ExecutionResult::Continue)
        }
        "get_next_prop" => {
            let p = object::next_prop(&vm.memory, ops[0], ops[1])?;
            store(vm, inst, p)?;
            Ok(ExecutionResult::Continue)
        }
        "print_obj" => {
            let name = object::short_name(&vm.memory, ops[0])?;
            trace!("print_obj {}: {name:?}", ops[0]);
            vm.console.print(&name);
            Ok(ExecutionResult::Continue)
        }
        _ => Err(ZError::fatal(format!("opcodes_object: unhandled opcode {}", inst.name))),
    }
}

pub fn handles(name: &str) -> bool {
    matches!(
        name,
        "jin" | "test_attr"
            | "set_attr"
            | "clear_attr"
            | "insert_obj"
            | "remove_obj"
            | "get_sibling"
            | "get_child"
            | "get_parent"
            | "get_prop"
            | "put_prop"
            | "get_prop_addr"
            | "get_prop_len"
            | "get_next_prop"
            | "print_obj"
    )
}
