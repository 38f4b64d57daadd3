//! Static instruction descriptors for the Intel 8080.
//!
//! One entry per opcode byte: mnemonic, operand tags, encoded length and the
//! base cycle count. Conditional calls and returns carry their not-taken
//! cycle count here; the executor charges 6 extra cycles on the taken path.
//! Conditional jumps cost 10 cycles either way. Undocumented opcodes
//! (0x08.. NOP, 0xCB JMP, 0xD9 RET, 0xDD/0xED/0xFD CALL) get descriptors
//! identical to their documented twins.

use std::fmt;

/// Pre-decoded operand tag. Registers and register pairs are identified at
/// table-construction time so the hot path never inspects strings.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Operand {
    None,
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    /// The memory operand: the byte at address HL.
    M,
    BC,
    DE,
    HL,
    SP,
    AF,
    /// Restart vector number, targeting address `8 * n`.
    Rst(u8),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::A => f.write_str("A"),
            Operand::B => f.write_str("B"),
            Operand::C => f.write_str("C"),
            Operand::D => f.write_str("D"),
            Operand::E => f.write_str("E"),
            Operand::H => f.write_str("H"),
            Operand::L => f.write_str("L"),
            Operand::M => f.write_str("M"),
            Operand::BC => f.write_str("BC"),
            Operand::DE => f.write_str("DE"),
            Operand::HL => f.write_str("HL"),
            Operand::SP => f.write_str("SP"),
            Operand::AF => f.write_str("AF"),
            Operand::Rst(n) => write!(f, "{n}"),
        }
    }
}

/// One row of the opcode table.
#[derive(Copy, Clone, Debug)]
pub struct Instr {
    pub mnemonic: &'static str,
    pub op1: Operand,
    pub op2: Operand,
    pub length: u8,
    pub cycles: u8,
}

const fn i(mnemonic: &'static str, op1: Operand, op2: Operand, length: u8, cycles: u8) -> Instr {
    Instr {
        mnemonic,
        op1,
        op2,
        length,
        cycles,
    }
}

use Operand::*;

pub const INSTRUCTIONS: [Instr; 256] = [
    // 0x00-0x0F
    i("NOP", None, None, 1, 4),   // 0x00
    i("LXI", BC, None, 3, 10),    // 0x01
    i("STAX", BC, None, 1, 7),    // 0x02
    i("INX", BC, None, 1, 5),     // 0x03
    i("INR", B, None, 1, 5),      // 0x04
    i("DCR", B, None, 1, 5),      // 0x05
    i("MVI", B, None, 2, 7),      // 0x06
    i("RLC", None, None, 1, 4),   // 0x07
    i("NOP", None, None, 1, 4),   // 0x08 *NOP
    i("DAD", BC, None, 1, 10),    // 0x09
    i("LDAX", BC, None, 1, 7),    // 0x0A
    i("DCX", BC, None, 1, 5),     // 0x0B
    i("INR", C, None, 1, 5),      // 0x0C
    i("DCR", C, None, 1, 5),      // 0x0D
    i("MVI", C, None, 2, 7),      // 0x0E
    i("RRC", None, None, 1, 4),   // 0x0F
    // 0x10-0x1F
    i("NOP", None, None, 1, 4),   // 0x10 *NOP
    i("LXI", DE, None, 3, 10),    // 0x11
    i("STAX", DE, None, 1, 7),    // 0x12
    i("INX", DE, None, 1, 5),     // 0x13
    i("INR", D, None, 1, 5),      // 0x14
    i("DCR", D, None, 1, 5),      // 0x15
    i("MVI", D, None, 2, 7),      // 0x16
    i("RAL", None, None, 1, 4),   // 0x17
    i("NOP", None, None, 1, 4),   // 0x18 *NOP
    i("DAD", DE, None, 1, 10),    // 0x19
    i("LDAX", DE, None, 1, 7),    // 0x1A
    i("DCX", DE, None, 1, 5),     // 0x1B
    i("INR", E, None, 1, 5),      // 0x1C
    i("DCR", E, None, 1, 5),      // 0x1D
    i("MVI", E, None, 2, 7),      // 0x1E
    i("RAR", None, None, 1, 4),   // 0x1F
    // 0x20-0x2F
    i("NOP", None, None, 1, 4),   // 0x20 *NOP
    i("LXI", HL, None, 3, 10),    // 0x21
    i("SHLD", None, None, 3, 16), // 0x22
    i("INX", HL, None, 1, 5),     // 0x23
    i("INR", H, None, 1, 5),      // 0x24
    i("DCR", H, None, 1, 5),      // 0x25
    i("MVI", H, None, 2, 7),      // 0x26
    i("DAA", None, None, 1, 4),   // 0x27
    i("NOP", None, None, 1, 4),   // 0x28 *NOP
    i("DAD", HL, None, 1, 10),    // 0x29
    i("LHLD", None, None, 3, 16), // 0x2A
    i("DCX", HL, None, 1, 5),     // 0x2B
    i("INR", L, None, 1, 5),      // 0x2C
    i("DCR", L, None, 1, 5),      // 0x2D
    i("MVI", L, None, 2, 7),      // 0x2E
    i("CMA", None, None, 1, 4),   // 0x2F
    // 0x30-0x3F
    i("NOP", None, None, 1, 4),   // 0x30 *NOP
    i("LXI", SP, None, 3, 10),    // 0x31
    i("STA", None, None, 3, 13),  // 0x32
    i("INX", SP, None, 1, 5),     // 0x33
    i("INR", M, None, 1, 10),     // 0x34
    i("DCR", M, None, 1, 10),     // 0x35
    i("MVI", M, None, 2, 10),     // 0x36
    i("STC", None, None, 1, 4),   // 0x37
    i("NOP", None, None, 1, 4),   // 0x38 *NOP
    i("DAD", SP, None, 1, 10),    // 0x39
    i("LDA", None, None, 3, 13),  // 0x3A
    i("DCX", SP, None, 1, 5),     // 0x3B
    i("INR", A, None, 1, 5),      // 0x3C
    i("DCR", A, None, 1, 5),      // 0x3D
    i("MVI", A, None, 2, 7),      // 0x3E
    i("CMC", None, None, 1, 4),   // 0x3F
    // 0x40-0x4F
    i("MOV", B, B, 1, 5),         // 0x40
    i("MOV", B, C, 1, 5),         // 0x41
    i("MOV", B, D, 1, 5),         // 0x42
    i("MOV", B, E, 1, 5),         // 0x43
    i("MOV", B, H, 1, 5),         // 0x44
    i("MOV", B, L, 1, 5),         // 0x45
    i("MOV", B, M, 1, 7),         // 0x46
    i("MOV", B, A, 1, 5),         // 0x47
    i("MOV", C, B, 1, 5),         // 0x48
    i("MOV", C, C, 1, 5),         // 0x49
    i("MOV", C, D, 1, 5),         // 0x4A
    i("MOV", C, E, 1, 5),         // 0x4B
    i("MOV", C, H, 1, 5),         // 0x4C
    i("MOV", C, L, 1, 5),         // 0x4D
    i("MOV", C, M, 1, 7),         // 0x4E
    i("MOV", C, A, 1, 5),         // 0x4F
    // 0x50-0x5F
    i("MOV", D, B, 1, 5),         // 0x50
    i("MOV", D, C, 1, 5),         // 0x51
    i("MOV", D, D, 1, 5),         // 0x52
    i("MOV", D, E, 1, 5),         // 0x53
    i("MOV", D, H, 1, 5),         // 0x54
    i("MOV", D, L, 1, 5),         // 0x55
    i("MOV", D, M, 1, 7),         // 0x56
    i("MOV", D, A, 1, 5),         // 0x57
    i("MOV", E, B, 1, 5),         // 0x58
    i("MOV", E, C, 1, 5),         // 0x59
    i("MOV", E, D, 1, 5),         // 0x5A
    i("MOV", E, E, 1, 5),         // 0x5B
    i("MOV", E, H, 1, 5),         // 0x5C
    i("MOV", E, L, 1, 5),         // 0x5D
    i("MOV", E, M, 1, 7),         // 0x5E
    i("MOV", E, A, 1, 5),         // 0x5F
    // 0x60-0x6F
    i("MOV", H, B, 1, 5),         // 0x60
    i("MOV", H, C, 1, 5),         // 0x61
    i("MOV", H, D, 1, 5),         // 0x62
    i("MOV", H, E, 1, 5),         // 0x63
    i("MOV", H, H, 1, 5),         // 0x64
    i("MOV", H, L, 1, 5),         // 0x65
    i("MOV", H, M, 1, 7),         // 0x66
    i("MOV", H, A, 1, 5),         // 0x67
    i("MOV", L, B, 1, 5),         // 0x68
    i("MOV", L, C, 1, 5),         // 0x69
    i("MOV", L, D, 1, 5),         // 0x6A
    i("MOV", L, E, 1, 5),         // 0x6B
    i("MOV", L, H, 1, 5),         // 0x6C
    i("MOV", L, L, 1, 5),         // 0x6D
    i("MOV", L, M, 1, 7),         // 0x6E
    i("MOV", L, A, 1, 5),         // 0x6F
    // 0x70-0x7F
    i("MOV", M, B, 1, 7),         // 0x70
    i("MOV", M, C, 1, 7),         // 0x71
    i("MOV", M, D, 1, 7),         // 0x72
    i("MOV", M, E, 1, 7),         // 0x73
    i("MOV", M, H, 1, 7),         // 0x74
    i("MOV", M, L, 1, 7),         // 0x75
    i("HLT", None, None, 1, 7),   // 0x76
    i("MOV", M, A, 1, 7),         // 0x77
    i("MOV", A, B, 1, 5),         // 0x78
    i("MOV", A, C, 1, 5),         // 0x79
    i("MOV", A, D, 1, 5),         // 0x7A
    i("MOV", A, E, 1, 5),         // 0x7B
    i("MOV", A, H, 1, 5),         // 0x7C
    i("MOV", A, L, 1, 5),         // 0x7D
    i("MOV", A, M, 1, 7),         // 0x7E
    i("MOV", A, A, 1, 5),         // 0x7F
    // 0x80-0x8F
    i("ADD", B, None, 1, 4),      // 0x80
    i("ADD", C, None, 1, 4),      // 0x81
    i("ADD", D, None, 1, 4),      // 0x82
    i("ADD", E, None, 1, 4),      // 0x83
    i("ADD", H, None, 1, 4),      // 0x84
    i("ADD", L, None, 1, 4),      // 0x85
    i("ADD", M, None, 1, 7),      // 0x86
    i("ADD", A, None, 1, 4),      // 0x87
    i("ADC", B, None, 1, 4),      // 0x88
    i("ADC", C, None, 1, 4),      // 0x89
    i("ADC", D, None, 1, 4),      // 0x8A
    i("ADC", E, None, 1, 4),      // 0x8B
    i("ADC", H, None, 1, 4),      // 0x8C
    i("ADC", L, None, 1, 4),      // 0x8D
    i("ADC", M, None, 1, 7),      // 0x8E
    i("ADC", A, None, 1, 4),      // 0x8F
    // 0x90-0x9F
    i("SUB", B, None, 1, 4),      // 0x90
    i("SUB", C, None, 1, 4),      // 0x91
    i("SUB", D, None, 1, 4),      // 0x92
    i("SUB", E, None, 1, 4),      // 0x93
    i("SUB", H, None, 1, 4),      // 0x94
    i("SUB", L, None, 1, 4),      // 0x95
    i("SUB", M, None, 1, 7),      // 0x96
    i("SUB", A, None, 1, 4),      // 0x97
    i("SBB", B, None, 1, 4),      // 0x98
    i("SBB", C, None, 1, 4),      // 0x99
    i("SBB", D, None, 1, 4),      // 0x9A
    i("SBB", E, None, 1, 4),      // 0x9B
    i("SBB", H, None, 1, 4),      // 0x9C
    i("SBB", L, None, 1, 4),      // 0x9D
    i("SBB", M, None, 1, 7),      // 0x9E
    i("SBB", A, None, 1, 4),      // 0x9F
    // 0xA0-0xAF
    i("ANA", B, None, 1, 4),      // 0xA0
    i("ANA", C, None, 1, 4),      // 0xA1
    i("ANA", D, None, 1, 4),      // 0xA2
    i("ANA", E, None, 1, 4),      // 0xA3
    i("ANA", H, None, 1, 4),      // 0xA4
    i("ANA", L, None, 1, 4),      // 0xA5
    i("ANA", M, None, 1, 7),      // 0xA6
    i("ANA", A, None, 1, 4),      // 0xA7
    i("XRA", B, None, 1, 4),      // 0xA8
    i("XRA", C, None, 1, 4),      // 0xA9
    i("XRA", D, None, 1, 4),      // 0xAA
    i("XRA", E, None, 1, 4),      // 0xAB
    i("XRA", H, None, 1, 4),      // 0xAC
    i("XRA", L, None, 1, 4),      // 0xAD
    i("XRA", M, None, 1, 7),      // 0xAE
    i("XRA", A, None, 1, 4),      // 0xAF
    // 0xB0-0xBF
    i("ORA", B, None, 1, 4),      // 0xB0
    i("ORA", C, None, 1, 4),      // 0xB1
    i("ORA", D, None, 1, 4),      // 0xB2
    i("ORA", E, None, 1, 4),      // 0xB3
    i("ORA", H, None, 1, 4),      // 0xB4
    i("ORA", L, None, 1, 4),      // 0xB5
    i("ORA", M, None, 1, 7),      // 0xB6
    i("ORA", A, None, 1, 4),      // 0xB7
    i("CMP", B, None, 1, 4),      // 0xB8
    i("CMP", C, None, 1, 4),      // 0xB9
    i("CMP", D, None, 1, 4),      // 0xBA
    i("CMP", E, None, 1, 4),      // 0xBB
    i("CMP", H, None, 1, 4),      // 0xBC
    i("CMP", L, None, 1, 4),      // 0xBD
    i("CMP", M, None, 1, 7),      // 0xBE
    i("CMP", A, None, 1, 4),      // 0xBF
    // 0xC0-0xCF
    i("RNZ", None, None, 1, 5),   // 0xC0 (11 if taken)
    i("POP", BC, None, 1, 10),    // 0xC1
    i("JNZ", None, None, 3, 10),  // 0xC2
    i("JMP", None, None, 3, 10),  // 0xC3
    i("CNZ", None, None, 3, 11),  // 0xC4 (17 if taken)
    i("PUSH", BC, None, 1, 11),   // 0xC5
    i("ADI", None, None, 2, 7),   // 0xC6
    i("RST", Rst(0), None, 1, 11), // 0xC7
    i("RZ", None, None, 1, 5),    // 0xC8 (11 if taken)
    i("RET", None, None, 1, 10),  // 0xC9
    i("JZ", None, None, 3, 10),   // 0xCA
    i("JMP", None, None, 3, 10),  // 0xCB *JMP
    i("CZ", None, None, 3, 11),   // 0xCC (17 if taken)
    i("CALL", None, None, 3, 17), // 0xCD
    i("ACI", None, None, 2, 7),   // 0xCE
    i("RST", Rst(1), None, 1, 11), // 0xCF
    // 0xD0-0xDF
    i("RNC", None, None, 1, 5),   // 0xD0 (11 if taken)
    i("POP", DE, None, 1, 10),    // 0xD1
    i("JNC", None, None, 3, 10),  // 0xD2
    i("OUT", None, None, 2, 10),  // 0xD3
    i("CNC", None, None, 3, 11),  // 0xD4 (17 if taken)
    i("PUSH", DE, None, 1, 11),   // 0xD5
    i("SUI", None, None, 2, 7),   // 0xD6
    i("RST", Rst(2), None, 1, 11), // 0xD7
    i("RC", None, None, 1, 5),    // 0xD8 (11 if taken)
    i("RET", None, None, 1, 10),  // 0xD9 *RET
    i("JC", None, None, 3, 10),   // 0xDA
    i("IN", None, None, 2, 10),   // 0xDB
    i("CC", None, None, 3, 11),   // 0xDC (17 if taken)
    i("CALL", None, None, 3, 17), // 0xDD *CALL
    i("SBI", None, None, 2, 7),   // 0xDE
    i("RST", Rst(3), None, 1, 11), // 0xDF
    // 0xE0-0xEF
    i("RPO", None, None, 1, 5),   // 0xE0 (11 if taken)
    i("POP", HL, None, 1, 10),    // 0xE1
    i("JPO", None, None, 3, 10),  // 0xE2
    i("XTHL", None, None, 1, 18), // 0xE3
    i("CPO", None, None, 3, 11),  // 0xE4 (17 if taken)
    i("PUSH", HL, None, 1, 11),   // 0xE5
    i("ANI", None, None, 2, 7),   // 0xE6
    i("RST", Rst(4), None, 1, 11), // 0xE7
    i("RPE", None, None, 1, 5),   // 0xE8 (11 if taken)
    i("PCHL", None, None, 1, 5),  // 0xE9
    i("JPE", None, None, 3, 10),  // 0xEA
    i("XCHG", None, None, 1, 4),  // 0xEB
    i("CPE", None, None, 3, 11),  // 0xEC (17 if taken)
    i("CALL", None, None, 3, 17), // 0xED *CALL
    i("XRI", None, None, 2, 7),   // 0xEE
    i("RST", Rst(5), None, 1, 11), // 0xEF
    // 0xF0-0xFF
    i("RP", None, None, 1, 5),    // 0xF0 (11 if taken)
    i("POP", AF, None, 1, 10),    // 0xF1
    i("JP", None, None, 3, 10),   // 0xF2
    i("DI", None, None, 1, 4),    // 0xF3
    i("CP", None, None, 3, 11),   // 0xF4 (17 if taken)
    i("PUSH", AF, None, 1, 11),   // 0xF5
    i("ORI", None, None, 2, 7),   // 0xF6
    i("RST", Rst(6), None, 1, 11), // 0xF7
    i("RM", None, None, 1, 5),    // 0xF8 (11 if taken)
    i("SPHL", None, None, 1, 5),  // 0xF9
    i("JM", None, None, 3, 10),   // 0xFA
    i("EI", None, None, 1, 4),    // 0xFB
    i("CM", None, None, 3, 11),   // 0xFC (17 if taken)
    i("CALL", None, None, 3, 17), // 0xFD *CALL
    i("CPI", None, None, 2, 7),   // 0xFE
    i("RST", Rst(7), None, 1, 11), // 0xFF
];
