#![crate_name = "agic"]

#[macro_use]
extern crate lazy_static;

pub mod logic_compiler;

/*
Layout of a compiled logic as produced by CompiledLogic::to_bytes
        0000    code length (u16, little endian)
        0002    bytecode
        ....    highest message number (u8)
        ....    message offsets, one i16 per message number (-1 = unused)
        ....    message text, each message terminated by 0x00
*/
