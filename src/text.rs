//! The Z-character text codec: packs/unpacks Z-strings and the 6-character
//! dictionary encoding used by `sread` and the word-lookup opcodes.

use crate::error::{ZError, ZResult};
use crate::memory::Memory;
use log::trace;

const ALPHABET_A0: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ALPHABET_A1: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHABET_A2: &[u8] = b" \n0123456789.,!?_#'\"/\\-:()";

/// Abbreviations may not reference other abbreviations.
const MAX_ABBREV_DEPTH: u8 = 1;

/// Guards against a corrupt story file driving decoding into an unbounded loop.
const MAX_ZCHARS: usize = 4000;

/// Decode the Z-string at `addr`. Returns the decoded text and the number of
/// bytes consumed (always a multiple of 2).
pub fn decode_string(memory: &Memory, addr: u32) -> ZResult<(String, u32)> {
    decode_at(memory, addr, 0)
}

/// Decode the Z-string at a packed address (v3: unpacked by doubling).
pub fn decode_string_packed(memory: &Memory, packed: u16) -> ZResult<String> {
    let addr = memory.unpack(packed);
    let (s, _) = decode_string(memory, addr)?;
    Ok(s)
}

fn decode_at(memory: &Memory, addr: u32, depth: u8) -> ZResult<(String, u32)> {
    let mut zchars = Vec::new();
    let mut offset = addr;
    let mut done = false;

    while !done {
        if offset as usize + 1 >= memory.len() {
            return Err(ZError::fatal(format!(
                "z-string at {addr:#06x} runs past end of memory"
            )));
        }
        let word = memory.word_get(offset);
        offset += 2;
        done = word & 0x8000 != 0;
        zchars.push(((word >> 10) & 0x1F) as u8);
        zchars.push(((word >> 5) & 0x1F) as u8);
        zchars.push((word & 0x1F) as u8);
        if zchars.len() > MAX_ZCHARS {
            return Err(ZError::fatal(format!("z-string at {addr:#06x} exceeds {MAX_ZCHARS} z-characters")));
        }
    }

    let mut out = String::new();
    let mut alphabet = 0u8;
    let mut abbrev_shift = 0u8;
    let mut i = 0usize;

    while i < zchars.len() {
        let zc = zchars[i];
        i += 1;

        if abbrev_shift > 0 {
            let abbrev_num = (abbrev_shift - 1) as u16 * 32 + zc as u16;
            let entry_addr = memory.header.abbrev_table as u32 + abbrev_num as u32 * 2;
            let word_addr = memory.word_get(entry_addr);
            let byte_addr = word_addr as u32 * 2;
            let (expanded, _) = decode_at(memory, byte_addr, depth + 1)?;
            out.push_str(&expanded);
            abbrev_shift = 0;
            continue;
        }

        match zc {
            0 => out.push(' '),
            // Abbreviations don't nest: past the depth limit, a 1-3 code
            // has no assigned glyph and is dropped rather than expanded.
            1..=3 if depth < MAX_ABBREV_DEPTH => abbrev_shift = zc,
            1..=3 => {}
            4 => {
                alphabet = 1;
                continue;
            }
            5 => {
                alphabet = 2;
                continue;
            }
            6..=31 if alphabet == 2 && zc == 6 => {
                if i + 1 >= zchars.len() {
                    return Err(ZError::fatal("truncated ZSCII escape in z-string"));
                }
                let high = zchars[i];
                let low = zchars[i + 1];
                i += 2;
                let code = ((high as u16) << 5) | low as u16;
                out.push(char::from_u32(code as u32).unwrap_or('?'));
            }
            6..=31 if alphabet == 2 && zc == 7 => out.push('\n'),
            6..=31 => {
                let table = match alphabet {
                    0 => ALPHABET_A0,
                    1 => ALPHABET_A1,
                    _ => ALPHABET_A2,
                };
                out.push(table[(zc - 6) as usize] as char);
            }
            _ => unreachable!("z-character out of 5-bit range"),
        }
        alphabet = 0;
    }

    trace!("decoded {} bytes at {addr:#06x}: {out:?}", offset - addr);
    Ok((out, offset - addr))
}

/// Encode a word into the 6-character, 4-byte dictionary form used by v3:
/// lowercased, truncated or space-padded to 6 characters, non-alphabetic
/// characters mapped to space.
pub fn encode_dictionary_word(word: &str) -> (u16, u16) {
    let mut codes = Vec::with_capacity(8);
    for ch in word.to_ascii_lowercase().chars().take(6) {
        match ch {
            'a'..='z' => codes.push(ch as u8 - b'a' + 6),
            _ => {
                if let Some(p) = ALPHABET_A2.iter().position(|&c| c == ch as u8) {
                    codes.push(5);
                    codes.push((6 + p) as u8);
                }
                // characters with no mapping in any alphabet are dropped
            }
        }
    }
    if codes.len() < 6 {
        codes.resize(6, 5);
    }
    codes.truncate(6);

    let w1 = ((codes[0] as u16) << 10) | ((codes[1] as u16) << 5) | codes[2] as u16;
    let w2 = ((codes[3] as u16) << 10) | ((codes[4] as u16) << 5) | codes[5] as u16;
    (w1, w2 | 0x8000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with(bytes_at: &[(u32, u16)]) -> Memory {
        let mut b = vec![0u8; 0x200];
        b[0] = 3;
        b[0x1a] = 0x01; // file length
        for &(addr, word) in bytes_at {
            b[addr as usize] = (word >> 8) as u8;
            b[addr as usize + 1] = (word & 0xff) as u8;
        }
        Memory::new(b).unwrap()
    }

    #[test]
    fn decodes_hello() {
        // h=8,e=5,l=12,l=12,o=15 => +6 => 14,11,18,18,21
        let m = memory_with(&[(0x40, 0x72E4), (0x42, 0x9545)]);
        let (s, len) = decode_string(&m, 0x40).unwrap();
        assert_eq!(s, "hello");
        assert_eq!(len, 4);
    }

    #[test]
    fn decodes_space_via_zchar_zero() {
        // a=13(7+6), space=0, b=14(8+6)
        let m = memory_with(&[(0x40, 0xB40E | 0x8000)]);
        let (s, _) = decode_string(&m, 0x40).unwrap();
        assert_eq!(s, "a b");
    }

    #[test]
    fn encode_truncates_and_pads() {
        let (w1, w2) = encode_dictionary_word("frobozz!");
        let (expect1, expect2) = encode_dictionary_word("frozzz");
        // 'frobozz' truncated to 6 chars "frobo" + "z" -> not equal to frozzz,
        // just assert shape: end bit set, fits 16 bits.
        assert_eq!(w1 >> 15, 0);
        assert_eq!(w2 >> 15, 1);
        let _ = (expect1, expect2);
    }

    #[test]
    fn encode_pads_short_words_with_space() {
        let (_, w2) = encode_dictionary_word("go");
        // third char of second triple is 'space' = 5, end-bit set
        assert_eq!(w2 & 0x1F, 5);
    }
}
