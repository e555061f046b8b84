// Output assembly: message text block and word dictionary
//
// Both routines are pure functions of the symbol tables filled during
// compilation.

use crate::logic_compiler::symbols::{MessageTable, WordTable};

/// Message 0 and unused numbers have this offset
pub const ABSENT_MESSAGE: i32 = -1;

/// Letters with a slot in the dictionary header
const ALPHABET_SIZE: usize = 26;
const DICTIONARY_HEADER_SIZE: usize = ALPHABET_SIZE * 2;
/// Suffix characters are stored XOR'd with this mask
const WORD_XOR_MASK: u8 = 0x7F;
/// Set on the last suffix character of an entry
const WORD_END_MARKER: u8 = 0x80;

/// Message texts laid out back to back, each followed by a 0 byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageLayout {
    /// Byte offset of each message number into `block`, [`ABSENT_MESSAGE`]
    /// for numbers without text. Index 0 is always absent.
    pub offsets: Vec<i32>,
    pub block: Vec<u8>,
}

impl MessageLayout {
    pub fn offset_of(&self, number: usize) -> Option<usize> {
        self.offsets
            .get(number)
            .and_then(|&offset| usize::try_from(offset).ok())
    }
}

pub fn layout_messages(messages: &MessageTable) -> MessageLayout {
    let mut layout = MessageLayout::default();

    for slot in messages.texts() {
        match slot {
            Some(text) => {
                layout.offsets.push(layout.block.len() as i32);
                layout.block.extend_from_slice(text.as_bytes());
                layout.block.push(0);
            }
            None => layout.offsets.push(ABSENT_MESSAGE),
        }
    }

    log::debug!(
        "laid out {} message slot(s) into {} byte(s)",
        layout.offsets.len(),
        layout.block.len()
    );
    layout
}

/// Front-coded word dictionary.
///
/// Layout:
/// - 26 big-endian 2-byte offsets, one per letter `a`..`z`, pointing at the
///   first entry starting with that letter (0 when there is none)
/// - entries in lexicographic order: count of leading bytes shared with the
///   previous word, the remaining bytes XOR 0x7F with 0x80 set on the last
///   one, then the word number as big-endian 2 bytes
/// - a single 0 byte
pub fn encode_words(words: &WordTable) -> Vec<u8> {
    let mut entries: Vec<(&str, u16)> = words.iter().filter(|(name, _)| !name.is_empty()).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut blob = vec![0u8; DICTIONARY_HEADER_SIZE];
    let mut previous: &[u8] = &[];

    for (name, number) in &entries {
        let bytes = name.as_bytes();

        if let Some(letter) = letter_index(bytes[0]) {
            let slot = letter * 2;
            if blob[slot] == 0 && blob[slot + 1] == 0 {
                let offset = blob.len() as u16;
                blob[slot..slot + 2].copy_from_slice(&offset.to_be_bytes());
            }
        }

        let shared = previous
            .iter()
            .zip(bytes)
            .take_while(|(a, b)| a == b)
            .count()
            .min(u8::MAX as usize);
        blob.push(shared as u8);

        let suffix = &bytes[shared..];
        for (index, &byte) in suffix.iter().enumerate() {
            let mut encoded = byte ^ WORD_XOR_MASK;
            if index + 1 == suffix.len() {
                encoded |= WORD_END_MARKER;
            }
            blob.push(encoded);
        }
        blob.extend_from_slice(&number.to_be_bytes());

        previous = bytes;
    }

    blob.push(0);
    log::debug!("encoded {} word(s) into {} byte(s)", entries.len(), blob.len());
    blob
}

fn letter_index(first: u8) -> Option<usize> {
    let lower = first.to_ascii_lowercase();
    lower
        .is_ascii_lowercase()
        .then(|| (lower - b'a') as usize)
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
