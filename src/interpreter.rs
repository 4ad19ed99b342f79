//! The decode-execute loop and the opcodes that move the program counter:
//! branching, calling, returning, and the handful of 0OP control opcodes.
//!
//! `call`/`ret` use a deferred-store design: `Instruction::decode` never
//! consumes `call`'s trailing store byte (see `instruction::stores_result`),
//! and `do_return` walks the restored PC back to that exact byte, reads it
//! as a destination variable, and writes the return value there. This keeps
//! the store binding with the *caller's* call site instead of threading a
//! `return_store` field through the call frame.

use crate::error::{ZError, ZResult};
use crate::instruction::Instruction;
use crate::opcodes_io;
use crate::opcodes_math;
use crate::opcodes_memory;
use crate::opcodes_object;
use crate::save;
use crate::vm::VM;
use log::{debug, trace};

/// Result of executing one instruction.
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// Continue to the next instruction.
    Continue,
    /// A comparison/test opcode's outcome, to be applied to `inst.branch` by
    /// `Interpreter::do_branch`.
    Condition(bool),
    /// Branch taken (or an implicit return through a branch), PC already updated.
    Branched,
    /// A routine was called, PC already updated to its first instruction.
    Called,
    /// A routine returned; carries the value for the caller's timer-style loops.
    Returned(u16),
    /// `quit` was executed.
    Quit,
    /// `restart` was executed; the VM has been reset to its initial state.
    Restarted,
    /// The call stack unwound past the root frame: the game is over.
    GameOver,
}

pub struct Interpreter {
    pub vm: VM,
    story: Vec<u8>,
    instruction_count: u64,
}

impl Interpreter {
    pub fn new(vm: VM, story: Vec<u8>) -> Interpreter {
        Interpreter { vm, story, instruction_count: 0 }
    }

    /// Run until `quit` or the game ends. Returns an error only on a fatal
    /// machine fault; a normal `quit`/`GameOver` is reported via `Ok`.
    pub fn run(&mut self) -> ZResult<()> {
        loop {
            match self.step()? {
                ExecutionResult::Quit | ExecutionResult::GameOver => {
                    self.vm.flush_console();
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    /// Decode and execute one instruction.
    pub fn step(&mut self) -> ZResult<ExecutionResult> {
        let pc = self.vm.pc;
        let inst = Instruction::decode(&self.vm.memory, pc)?;
        self.instruction_count += 1;
        trace!("#{} {:05x}: {}", self.instruction_count, pc, inst.name);

        // Control-flow opcodes set `vm.pc` themselves; everything else
        // advances past the decoded instruction first.
        if !is_control_flow(inst.name) {
            self.vm.pc += inst.size;
        }

        let ops = self.resolve_operands(&inst)?;
        self.dispatch(&inst, &ops)
    }

    fn resolve_operands(&mut self, inst: &Instruction) -> ZResult<Vec<u16>> {
        inst.operands
            .iter()
            .map(|(t, v)| match t {
                crate::instruction::OperandType::Variable => self.vm.read_variable(*v as u8),
                _ => Ok(*v),
            })
            .collect()
    }

    fn dispatch(&mut self, inst: &Instruction, ops: &[u16]) -> ZResult<ExecutionResult> {
        let result = match inst.name {
            "call" => self.do_call(ops, inst.addr + inst.size),
            "rtrue" => self.do_return(1),
            "rfalse" => self.do_return(0),
            "print_ret" => {
                self.vm.console.print(inst.text.as_deref().unwrap_or(""));
                self.vm.console.new_line();
                self.do_return(1)
            }
            "ret" => self.do_return(ops[0]),
            "ret_popped" => {
                let v = self.vm.stack.pop()?;
                self.do_return(v)
            }
            "pop" => {
                self.vm.stack.pop()?;
                Ok(ExecutionResult::Continue)
            }
            "jump" => {
                let offset = ops[0] as i16 as i32;
                self.vm.pc = (inst.addr as i32 + inst.size as i32 + offset - 2) as u32;
                Ok(ExecutionResult::Branched)
            }
            "quit" => Ok(ExecutionResult::Quit),
            "restart" => {
                self.vm.memory.bytes.copy_from_slice(&self.story);
                self.vm.stack.reset();
                self.vm.pc = self.vm.memory.header.initial_pc as u32;
                Ok(ExecutionResult::Restarted)
            }
            "save" => {
                let path = self.prompt_filename()?;
                let ok = save::save_game(&self.vm, path.trim()).is_ok();
                self.do_branch(inst, ok)
            }
            "restore" => {
                let path = self.prompt_filename()?;
                match save::restore_game(&mut self.vm, path.trim()) {
                    Ok(()) => {
                        self.vm.reprime_score_watch();
                        self.do_branch(inst, true)
                    }
                    Err(e) => {
                        debug!("restore failed: {e}");
                        self.do_branch(inst, false)
                    }
                }
            }
            name if opcodes_math::handles(name) => opcodes_math::execute(&mut self.vm, inst, ops),
            name if opcodes_object::handles(name) => opcodes_object::execute(&mut self.vm, inst, ops),
            name if opcodes_memory::handles(name) => opcodes_memory::execute(&mut self.vm, inst, ops),
            name if opcodes_io::handles(name) => opcodes_io::execute(&mut self.vm, inst, ops),
            _ => Err(ZError::fatal(format!("unimplemented opcode {} at {:#06x}", inst.name, inst.addr))),
        }?;

        match result {
            ExecutionResult::Condition(c) => self.do_branch(inst, c),
            other => Ok(other),
        }
    }

    /// Apply a comparison opcode's condition to the instruction's branch
    /// data: offset 0/1 are the implicit `rfalse`/`rtrue` shorthand, anything
    /// else is a PC-relative jump.
    fn do_branch(&mut self, inst: &Instruction, condition: bool) -> ZResult<ExecutionResult> {
        let Some(branch) = &inst.branch else {
            return Ok(ExecutionResult::Continue);
        };
        if condition != branch.on_true {
            return Ok(ExecutionResult::Continue);
        }
        match branch.offset {
            0 => self.do_return(0),
            1 => self.do_return(1),
            offset => {
                self.vm.pc = (self.vm.pc as i32 + offset as i32 - 2) as u32;
                Ok(ExecutionResult::Branched)
            }
        }
    }

    /// `call`'s store byte sits unread right after the instruction - at
    /// `return_pc` - so `do_return` can walk straight back to it.
    fn do_call(&mut self, ops: &[u16], return_pc: u32) -> ZResult<ExecutionResult> {
        let packed = ops[0];
        let args = &ops[1..];

        if packed == 0 {
            // Calling address 0 returns false without pushing a frame; the
            // store byte still has to be consumed here since there is no
            // frame for `do_return` to pop.
            let store_var = self.vm.memory.byte_get(return_pc);
            self.vm.pc = return_pc + 1;
            self.vm.write_variable(store_var, 0)?;
            return Ok(ExecutionResult::Returned(0));
        }

        let addr = self.unpack_routine_address(packed);
        if addr as usize >= self.vm.memory.header.file_length {
            return Err(ZError::fatal(format!("call: target address {addr:#06x} outside the story file")));
        }
        let declared_locals = self.vm.memory.byte_get(addr);
        if declared_locals > 15 {
            return Err(ZError::fatal(format!(
                "call: routine at {addr:#06x} declares {declared_locals} locals (max 15)"
            )));
        }
        let declared_locals = declared_locals as usize;
        let mut locals = vec![0u16; declared_locals];
        for (i, local) in locals.iter_mut().enumerate() {
            *local = self.vm.memory.word_get(addr + 1 + i as u32 * 2);
        }
        for (i, &arg) in args.iter().enumerate() {
            if i < locals.len() {
                locals[i] = arg;
            }
        }

        self.vm.stack.push_frame(return_pc, &locals)?;
        self.vm.pc = addr + 1 + declared_locals as u32 * 2;
        Ok(ExecutionResult::Called)
    }

    fn do_return(&mut self, value: u16) -> ZResult<ExecutionResult> {
        if !self.vm.stack.has_frame() {
            return Ok(ExecutionResult::GameOver);
        }
        let return_pc = self.vm.stack.pop_frame()?;
        let store_var = self.vm.memory.byte_get(return_pc);
        self.vm.pc = return_pc + 1;
        self.vm.write_variable(store_var, value)?;

        if self.vm.stack.has_frame() {
            Ok(ExecutionResult::Returned(value))
        } else {
            Ok(ExecutionResult::GameOver)
        }
    }

    fn unpack_routine_address(&self, packed: u16) -> u32 {
        self.vm.memory.unpack(packed)
    }

    fn prompt_filename(&mut self) -> ZResult<String> {
        self.vm.console.print("Filename: ");
        self.vm.console.flush();
        self.vm.console.read_line().map_err(ZError::Io)
    }
}

/// Opcodes this module handles directly because they move `vm.pc`, rather
/// than returning a plain `Continue`/`Condition` for the shared dispatch.
fn is_control_flow(name: &str) -> bool {
    matches!(name, "call" | "rtrue" | "rfalse" | "print_ret" | "ret" | "ret_popped" | "jump" | "restart")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use test_log::test;

    fn story_bytes() -> Vec<u8> {
        let mut b = vec![0u8; 0x200];
        b[0x00] = 3;
        b[0x04] = 0x01;
        b[0x05] = 0x00; // high mem base
        b[0x06] = 0x00;
        b[0x07] = 0x40; // initial pc
        b[0x0c] = 0x01;
        b[0x0d] = 0x00; // globals
        b[0x0e] = 0x01;
        b[0x0f] = 0x00; // static base
        b[0x1a] = 0x01;
        b[0x1b] = 0x00; // file length
        b
    }

    fn interpreter_with(program: &[u8]) -> Interpreter {
        let mut b = story_bytes();
        b[0x40..0x40 + program.len()].copy_from_slice(program);
        let memory = Memory::new(b.clone()).unwrap();
        Interpreter::new(VM::new(memory), b)
    }

    #[test]
    fn push_then_quit() {
        // push 42 (VAR:0x08), quit (0OP:0x0A)
        let mut interp = interpreter_with(&[0xE8, 0x7F, 0x2A, 0xBA]);
        interp.step().unwrap();
        assert_eq!(interp.vm.stack.peek(0).unwrap(), 42);
        match interp.step().unwrap() {
            ExecutionResult::Quit => {}
            other => panic!("expected Quit, got {other:?}"),
        }
    }

    #[test]
    fn call_and_return_store_round_trip() {
        // call (0xE0) at 0x40, type byte 0x7F (one small-constant operand),
        // operand 0x28 (packed -> byte addr 0x50), store var 0x10 (global 16)
        // left unconsumed at 0x43. Routine at 0x50: 0 locals, then rtrue.
        let mut b = story_bytes();
        b[0x40] = 0xE0;
        b[0x41] = 0x7F;
        b[0x42] = 0x28;
        b[0x43] = 0x10;
        b[0x50] = 0x00;
        b[0x51] = 0xB0; // rtrue
        let memory = Memory::new(b.clone()).unwrap();
        let mut interp = Interpreter::new(VM::new(memory), b);

        let result = interp.step().unwrap();
        assert!(matches!(result, ExecutionResult::Called));
        assert_eq!(interp.vm.pc, 0x51);

        let result = interp.step().unwrap();
        assert!(matches!(result, ExecutionResult::Returned(1)));
        assert_eq!(interp.vm.read_global(16), 1);
    }

    #[test]
    fn calling_address_zero_returns_false_without_pushing_a_frame() {
        let mut b = story_bytes();
        b[0x40] = 0xE0;
        b[0x41] = 0x7F;
        b[0x42] = 0x00; // packed addr 0
        b[0x43] = 0x10; // store var 16
        let memory = Memory::new(b.clone()).unwrap();
        let mut interp = Interpreter::new(VM::new(memory), b);
        let frame_before = interp.vm.stack.frame;

        interp.step().unwrap();
        assert_eq!(interp.vm.read_global(16), 0);
        assert_eq!(interp.vm.stack.frame, frame_before);
    }
}
