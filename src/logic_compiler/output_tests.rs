// Output assembly tests

#[cfg(test)]
mod tests {
    use crate::logic_compiler::error::SourceLocation;
    use crate::logic_compiler::output::{encode_words, layout_messages, ABSENT_MESSAGE};
    use crate::logic_compiler::symbols::{MessageTable, WordTable};
    use test_log::test;

    fn here() -> SourceLocation {
        SourceLocation::new("test.lgc".into(), 1)
    }

    #[test]
    fn test_sparse_message_layout() {
        let mut messages = MessageTable::new();
        messages.define(1, "hi".to_string(), &here()).unwrap();
        messages.define(3, "bye".to_string(), &here()).unwrap();

        let layout = layout_messages(&messages);
        assert_eq!(layout.offsets, vec![ABSENT_MESSAGE, 0, ABSENT_MESSAGE, 3]);
        assert_eq!(layout.block, b"hi\0bye\0".to_vec());
        assert_eq!(layout.offset_of(3), Some(3));
        assert_eq!(layout.offset_of(2), None);
        assert_eq!(layout.offset_of(9), None);
    }

    #[test]
    fn test_no_messages() {
        let layout = layout_messages(&MessageTable::new());
        assert_eq!(layout.offsets, vec![ABSENT_MESSAGE]);
        assert!(layout.block.is_empty());
    }

    #[test]
    fn test_empty_message_takes_one_byte() {
        let mut messages = MessageTable::new();
        messages.define(1, String::new(), &here()).unwrap();
        messages.define(2, "x".to_string(), &here()).unwrap();

        let layout = layout_messages(&messages);
        assert_eq!(layout.offsets, vec![ABSENT_MESSAGE, 0, 1]);
        assert_eq!(layout.block, vec![0, b'x', 0]);
    }

    #[test]
    fn test_word_dictionary_encoding() {
        let mut words = WordTable::new();
        words.define("look", 20, &here()).unwrap();
        words.define("go", 5, &here()).unwrap();
        words.define("get", 6, &here()).unwrap();

        let blob = encode_words(&words);

        let mut expected = vec![0u8; 52];
        expected[12..14].copy_from_slice(&[0x00, 0x34]); // 'g' -> 52
        expected[22..24].copy_from_slice(&[0x00, 0x3E]); // 'l' -> 62
        expected.extend_from_slice(&[0x00, 0x18, 0x1A, 0x8B, 0x00, 0x06]); // get
        expected.extend_from_slice(&[0x01, 0x90, 0x00, 0x05]); // go, sharing "g"
        expected.extend_from_slice(&[0x00, 0x13, 0x10, 0x10, 0x94, 0x00, 0x14]); // look
        expected.push(0);

        assert_eq!(blob, expected);
    }

    #[test]
    fn test_empty_word_dictionary() {
        let blob = encode_words(&WordTable::new());
        assert_eq!(blob.len(), 53);
        assert!(blob.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_words_sharing_a_number() {
        let mut words = WordTable::new();
        words.define("a", 1, &here()).unwrap();
        words.define("an", 1, &here()).unwrap();

        let blob = encode_words(&words);
        assert_eq!(&blob[0..2], &[0x00, 0x34]);
        assert_eq!(
            &blob[52..],
            &[0x00, 0x1E | 0x80, 0x00, 0x01, 0x01, 0x11 | 0x80, 0x00, 0x01, 0x00]
        );
    }
}
