//! Linear 8080 disassembler.
//!
//! Walks a byte buffer using the instruction-length field of the descriptor
//! table and renders one line per instruction:
//!
//! ```text
//! 0000: 31 00 24    LXI SP, $2400
//! 0003: 3e 42       MVI A, $42
//! 0005: c3 00 00    JMP $0000
//! ```
//!
//! Immediates are reconstructed as little-endian hex literals. Bytes at the
//! end of the buffer that do not form a whole instruction are emitted as
//! `DB` data lines.

use std::fmt::Write;

use crate::cpu::opcodes::{Operand, INSTRUCTIONS};

/// Disassemble a whole buffer, one line per instruction.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let length = INSTRUCTIONS[bytes[i] as usize].length as usize;
        if i + length > bytes.len() {
            for (j, &b) in bytes.iter().enumerate().skip(i) {
                let _ = writeln!(out, "{j:04x}: {b:02x}          DB ${b:02x}");
            }
            break;
        }
        let _ = writeln!(out, "{}", format_line(i as u16, &bytes[i..i + length]));
        i += length;
    }
    out
}

/// Render one instruction whose encoded bytes are `code`.
pub fn format_line(addr: u16, code: &[u8]) -> String {
    let instr = &INSTRUCTIONS[code[0] as usize];

    let mut line = format!("{addr:04x}: ");
    match code.len() {
        1 => {
            let _ = write!(line, "{:02x}          ", code[0]);
        }
        2 => {
            let _ = write!(line, "{:02x} {:02x}       ", code[0], code[1]);
        }
        _ => {
            let _ = write!(line, "{:02x} {:02x} {:02x}    ", code[0], code[1], code[2]);
        }
    }
    line.push_str(instr.mnemonic);

    let mut operands: Vec<String> = Vec::new();
    if instr.op1 != Operand::None {
        operands.push(instr.op1.to_string());
    }
    if instr.op2 != Operand::None {
        operands.push(instr.op2.to_string());
    }
    match code.len() {
        2 => operands.push(format!("${:02x}", code[1])),
        3 => operands.push(format!(
            "${:04x}",
            u16::from(code[2]) << 8 | u16::from(code[1])
        )),
        _ => {}
    }
    if !operands.is_empty() {
        line.push(' ');
        line.push_str(&operands.join(", "));
    }
    line
}
