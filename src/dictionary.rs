//! Dictionary lookup and the `sread` tokenizer.

use crate::error::ZResult;
use crate::memory::Memory;
use crate::text::encode_dictionary_word;
use log::trace;

/// One token found while scanning a text buffer: its text, and its byte
/// offset/length within that buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub len: usize,
}

/// Read the dictionary header's separator list.
pub fn separators(memory: &Memory) -> Vec<u8> {
    let dict_addr = memory.header.dictionary as u32;
    let count = memory.byte_get(dict_addr);
    (0..count as u32).map(|i| memory.byte_get(dict_addr + 1 + i)).collect()
}

/// Split `text` into tokens: each separator character becomes its own
/// one-character token, and runs of whitespace delimit words without
/// producing tokens of their own.
pub fn tokenize(text: &str, separators: &[u8]) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;

    let is_sep = |b: u8| separators.contains(&b);

    for (i, &b) in bytes.iter().enumerate() {
        if is_sep(b) {
            if let Some(start) = word_start.take() {
                tokens.push(Token { text: text[start..i].to_string(), start, len: i - start });
            }
            tokens.push(Token { text: (b as char).to_string(), start: i, len: 1 });
        } else if b == b' ' {
            if let Some(start) = word_start.take() {
                tokens.push(Token { text: text[start..i].to_string(), start, len: i - start });
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(start) = word_start {
        tokens.push(Token { text: text[start..].to_string(), start, len: bytes.len() - start });
    }
    tokens
}

/// Binary-search the dictionary for `word` (already lowercased), returning
/// the entry's byte address, or 0 if not found.
pub fn lookup(memory: &Memory, word: &str) -> u16 {
    let dict_addr = memory.header.dictionary as u32;
    let sep_count = memory.byte_get(dict_addr) as u32;
    let entry_start = dict_addr + 1 + sep_count;
    let entry_length = memory.byte_get(entry_start) as u32;
    let entry_count = memory.word_get(entry_start + 1) as i32;
    let entries_addr = entry_start + 3;

    let (search1, search2) = encode_dictionary_word(word);

    let mut low = 0i32;
    let mut high = entry_count - 1;
    while low <= high {
        let mid = (low + high) / 2;
        let addr = entries_addr + mid as u32 * entry_length;
        let w1 = memory.word_get(addr);
        let w2 = memory.word_get(addr + 2);
        if (search1, search2) < (w1, w2) {
            high = mid - 1;
        } else if (search1, search2) > (w1, w2) {
            low = mid + 1;
        } else {
            trace!("dictionary lookup '{word}' -> {addr:#06x}");
            return addr as u16;
        }
    }
    trace!("dictionary lookup '{word}' -> not found");
    0
}

/// Tokenize the text buffer and write dictionary addresses, word lengths,
/// and text-buffer offsets into the parse buffer. The v3 text buffer has no
/// stored length byte: byte 0 is the maximum input length, and the typed
/// text starts at byte 1, zero-terminated.
pub fn parse(memory: &mut Memory, text_buffer: u32, parse_buffer: u32) -> ZResult<()> {
    let mut text = String::new();
    let mut i = 0u32;
    loop {
        let b = memory.byte_get(text_buffer + 1 + i);
        if b == 0 {
            break;
        }
        text.push(b as char);
        i += 1;
    }

    let seps = separators(memory);
    let tokens = tokenize(&text, &seps);
    let max_words = memory.byte_get(parse_buffer) as usize;
    let count = tokens.len().min(max_words);

    memory.byte_set(parse_buffer + 1, count as u8);
    for (i, tok) in tokens.iter().take(count).enumerate() {
        let dict_addr = lookup(memory, &tok.text);
        let entry = parse_buffer + 2 + (i as u32 * 4);
        memory.word_set(entry, dict_addr);
        memory.byte_set(entry + 2, tok.len as u8);
        memory.byte_set(entry + 3, (tok.start + 1) as u8);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_whitespace_and_keeps_separators() {
        let seps = [b','];
        let toks = tokenize("take lamp, then go north", &seps);
        let texts: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["take", "lamp", ",", "then", "go", "north"]);
    }

    #[test]
    fn separator_adjacent_to_word_has_no_gap() {
        let seps = [b'.'];
        let toks = tokenize("go.", &seps);
        assert_eq!(toks[0].text, "go");
        assert_eq!(toks[0].start, 0);
        assert_eq!(toks[1].text, ".");
        assert_eq!(toks[1].start, 2);
    }
}
