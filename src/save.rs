//! Plain-ASCII save/restore: dynamic memory, stack, PC and frame pointer as
//! hex text, rather than the binary Quetzal container other interpreters use.
//! Chosen so a save file is an ordinary line-oriented text file; see the
//! restore side's strict release/serial check for why these files don't
//! travel between story revisions.

use crate::error::{ZError, ZResult};
use crate::vm::VM;
use std::fs;

const WORDS_PER_LINE: usize = 40;
const BYTES_PER_LINE: usize = 40;

pub fn save_game(vm: &VM, path: &str) -> ZResult<()> {
    let mut out = String::new();
    out.push_str("releasenumber.serialcode\n");
    out.push_str(&format!("{}.{}\n", vm.memory.header.release, vm.memory.header.serial_string()));

    out.push_str("pc\n");
    out.push_str(&format!("{:X}\n", vm.pc));

    let stack = vm.stack.live_cells();
    out.push_str("stack\n");
    out.push_str(&format!("{:X}\n", stack.len()));
    write_hex_words(&mut out, stack);

    out.push_str("stack.topindex\n");
    out.push_str(&format!("{:X}\n", vm.stack.top));

    out.push_str("stack.stackframeindex\n");
    out.push_str(&format!("{:X}\n", vm.stack.frame));

    let dynamic = &vm.memory.bytes[0..vm.memory.static_base() as usize];
    out.push_str("dynamicmemory\n");
    out.push_str(&format!("{:X}\n", dynamic.len()));
    write_hex_bytes(&mut out, dynamic);

    fs::write(path, out).map_err(ZError::Io)
}

pub fn restore_game(vm: &mut VM, path: &str) -> ZResult<()> {
    let text = fs::read_to_string(path).map_err(ZError::Io)?;
    let mut lines = text.lines();

    expect_header(&mut lines, "releasenumber.serialcode")?;
    let header_line = next_line(&mut lines)?;
    let (release_str, serial) =
        header_line.split_once('.').ok_or_else(|| ZError::fatal("save file: malformed release.serial line"))?;
    let release: u16 = release_str.parse().map_err(|_| ZError::fatal("save file: non-numeric release"))?;
    if release != vm.memory.header.release || serial != vm.memory.header.serial_string() {
        return Err(ZError::fatal("save file: release/serial does not match the running story"));
    }

    expect_header(&mut lines, "pc")?;
    let pc = u32::from_str_radix(next_line(&mut lines)?, 16).map_err(|_| ZError::fatal("save file: malformed pc"))?;

    expect_header(&mut lines, "stack")?;
    let stack_len =
        usize::from_str_radix(next_line(&mut lines)?, 16).map_err(|_| ZError::fatal("save file: malformed stack length"))?;
    let stack_words = read_hex_words(&mut lines, stack_len)?;

    expect_header(&mut lines, "stack.topindex")?;
    let top =
        i32::from_str_radix(next_line(&mut lines)?, 16).map_err(|_| ZError::fatal("save file: malformed stack.topindex"))?;

    expect_header(&mut lines, "stack.stackframeindex")?;
    let frame = i32::from_str_radix(next_line(&mut lines)?, 16)
        .map_err(|_| ZError::fatal("save file: malformed stack.stackframeindex"))?;

    expect_header(&mut lines, "dynamicmemory")?;
    let dyn_len = usize::from_str_radix(next_line(&mut lines)?, 16)
        .map_err(|_| ZError::fatal("save file: malformed dynamicmemory length"))?;
    let dyn_bytes = read_hex_bytes(&mut lines, dyn_len)?;

    if dyn_len > vm.memory.static_base() as usize {
        return Err(ZError::fatal("save file: dynamic memory longer than this story's static base"));
    }

    // Parsing and validation succeeded for every section before any state is
    // touched, so a failure above never leaves the VM partially restored.
    vm.stack.restore_from(top, frame, &stack_words)?;
    vm.memory.bytes[..dyn_len].copy_from_slice(&dyn_bytes);
    vm.pc = pc;
    Ok(())
}

fn write_hex_words(out: &mut String, words: &[u16]) {
    for chunk in words.chunks(WORDS_PER_LINE) {
        let line: Vec<String> = chunk.iter().map(|w| format!("{w:04X}")).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
}

fn write_hex_bytes(out: &mut String, bytes: &[u8]) {
    for chunk in bytes.chunks(BYTES_PER_LINE) {
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
}

fn expect_header<'a>(lines: &mut impl Iterator<Item = &'a str>, expected: &str) -> ZResult<()> {
    let line = next_line(lines)?;
    if line != expected {
        return Err(ZError::fatal(format!("save file: expected section '{expected}', found '{line}'")));
    }
    Ok(())
}

fn next_line<'a>(lines: &mut impl Iterator<Item = &'a str>) -> ZResult<&'a str> {
    lines.next().ok_or_else(|| ZError::fatal("save file: truncated"))
}

fn read_hex_words<'a>(lines: &mut impl Iterator<Item = &'a str>, count: usize) -> ZResult<Vec<u16>> {
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let line = next_line(lines)?;
        for tok in line.split_whitespace() {
            out.push(u16::from_str_radix(tok, 16).map_err(|_| ZError::fatal("save file: malformed stack word"))?);
        }
    }
    out.truncate(count);
    Ok(out)
}

fn read_hex_bytes<'a>(lines: &mut impl Iterator<Item = &'a str>, count: usize) -> ZResult<Vec<u8>> {
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let line = next_line(lines)?;
        for tok in line.split_whitespace() {
            out.push(u8::from_str_radix(tok, 16).map_err(|_| ZError::fatal("save file: malformed memory byte"))?);
        }
    }
    out.truncate(count);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use tempfile::NamedTempFile;

    fn sample_vm() -> VM {
        let mut b = vec![0u8; 0x200];
        b[0x00] = 3;
        b[0x0e] = 0x01;
        b[0x0f] = 0x00; // static base 0x0100
        b[0x12..0x18].copy_from_slice(b"840726");
        b[0x03] = 88; // release
        b[0x1a] = 0x01; // file length
        VM::new(Memory::new(b).unwrap())
    }

    #[test]
    fn save_then_restore_round_trips_state() {
        let mut vm = sample_vm();
        vm.stack.push(0xBEEF).unwrap();
        vm.memory.byte_set(0x10, 0x42);
        vm.pc = 0x55AA;

        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().into_owned();
        save_game(&vm, &path).unwrap();

        let mut restored = sample_vm();
        restore_game(&mut restored, &path).unwrap();

        assert_eq!(restored.pc, 0x55AA);
        assert_eq!(restored.stack.top, vm.stack.top);
        assert_eq!(restored.stack.frame, vm.stack.frame);
        assert_eq!(restored.memory.byte_get(0x10), 0x42);
    }

    #[test]
    fn restore_rejects_mismatched_serial() {
        let vm = sample_vm();
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().into_owned();
        save_game(&vm, &path).unwrap();

        let mut b = vec![0u8; 0x200];
        b[0x00] = 3;
        b[0x0e] = 0x01;
        b[0x12..0x18].copy_from_slice(b"999999");
        b[0x1a] = 0x01;
        let mut other = VM::new(Memory::new(b).unwrap());

        assert!(restore_game(&mut other, &path).is_err());
    }
}
