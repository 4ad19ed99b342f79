//! Text output, `sread`, `random`, and the miscellaneous 0OP/VAR host ops.
//!
//! Screen-model opcodes that only make sense with a split-window display
//! (`split_window`, `set_window`, `sound_effect`, the stream toggles) are
//! accepted and ignored on this single-window console rather than treated
//! as fatal - most v3 games call them opportunistically and keep working
//! fine without a status window.

use crate::dictionary;
use crate::error::{ZError, ZResult};
use crate::instruction::Instruction;
use crate::interpreter::ExecutionResult;
use crate::text;
use crate::vm::VM;
use log::{trace, warn};

fn store(vm: &mut VM, inst: &Instruction, value: u16) -> ZResult<()> {
    if let Some(var) = inst.store_var {
        vm.write_variable(var, value)?;
    }
    Ok(())
}

pub fn execute(vm: &mut VM, inst: &Instruction, ops: &[u16]) -> ZResult<ExecutionResult> {
    match inst.name {
        "print" => {
            vm.console.print(inst.text.as_deref().unwrap_or(""));
            Ok(ExecutionResult::Continue)
        }
        "print_addr" => {
            vm.memory.check_readable_dyn_static(ops[0] as u32, "print_addr")?;
            let (s, _) = text::decode_string(&vm.memory, ops[0] as u32)?;
            vm.console.print(&s);
            Ok(ExecutionResult::Continue)
        }
        "print_paddr" => {
            let s = text::decode_string_packed(&vm.memory, ops[0])?;
            vm.console.print(&s);
            Ok(ExecutionResult::Continue)
        }
        "print_char" => {
            let b = ops[0] as u8;
            if b == 0x0D {
                vm.console.new_line();
            } else if (0x20..=0x7E).contains(&b) {
                vm.console.print(&(b as char).to_string());
            }
            Ok(ExecutionResult::Continue)
        }
        "print_num" => {
            vm.console.print(&(ops[0] as i16).to_string());
            Ok(ExecutionResult::Continue)
        }
        "new_line" => {
            vm.console.new_line();
            Ok(ExecutionResult::Continue)
        }
        "random" => {
            let v = vm.rng.random(ops[0] as i16);
            store(vm, inst, v)?;
            Ok(ExecutionResult::Continue)
        }
        "sread" => {
            vm.flush_console();
            let line = vm.console.read_line().map_err(ZError::Io)?;
            let text_buffer = ops[0] as u32;
            let parse_buffer = ops[1] as u32;
            let max_len = vm.memory.byte_get(text_buffer) as usize;
            let lowered: String = line.trim().to_ascii_lowercase();
            let mut i = 0usize;
            for ch in lowered.bytes().take(max_len.saturating_sub(1)) {
                vm.memory.byte_set(text_buffer + 1 + i as u32, ch);
                i += 1;
            }
            vm.memory.byte_set(text_buffer + 1 + i as u32, 0);
            dictionary::parse(&mut vm.memory, text_buffer, parse_buffer)?;
            Ok(ExecutionResult::Continue)
        }
        "verify" => {
            let mut sum: u32 = 0;
            for addr in 0x40..vm.memory.header.file_length.min(vm.memory.len()) {
                sum += vm.memory.byte_get(addr as u32) as u32;
            }
            let ok = (sum as u16) == vm.memory.header.checksum;
            Ok(ExecutionResult::Condition(ok))
        }
        "show_status" => {
            trace!("show_status: no-op on a single-window console");
            Ok(ExecutionResult::Continue)
        }
        "nop" => Ok(ExecutionResult::Continue),
        "split_window" | "set_window" | "output_stream" | "input_stream" | "sound_effect" => {
            warn!("{}: ignored (no split-window/stream support)", inst.name);
            Ok(ExecutionResult::Continue)
        }
        _ => Err(ZError::fatal(format!("opcodes_io: unhandled opcode {}", inst.name))),
    }
}

pub fn handles(name: &str) -> bool {
    matches!(
        name,
        "print"
            | "print_addr"
            | "print_paddr"
            | "print_char"
            | "print_num"
            | "new_line"
            | "random"
            | "sread"
            | "verify"
            | "show_status"
            | "nop"
            | "split_window"
            | "set_window"
            | "output_stream"
            | "input_stream"
            | "sound_effect"
    )
}
