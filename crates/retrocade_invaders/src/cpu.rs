use std::fmt;

use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::apu::{self, SoundDispatch};

pub mod opcodes;

use opcodes::{Instr, Operand, INSTRUCTIONS};

/// Memory capability handle for the CPU.
///
/// The CPU sees the machine only through this trait (plus [`SoundDispatch`]
/// for the discrete sound triggers), so the core never owns the concrete
/// bus and the machine never owns the CPU back.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

// Flag bit positions in F. Bits 5 and 3 are wired low, bit 1 is wired high.
const F_SIGN: u8 = 0x80;
const F_ZERO: u8 = 0x40;
const F_AUX: u8 = 0x10;
const F_PARITY: u8 = 0x04;
const F_CARRY: u8 = 0x01;
const F_MASK: u8 = 0xD7;
const F_ALWAYS_ON: u8 = 0x02;

#[inline]
fn parity(v: u8) -> bool {
    v.count_ones() % 2 == 0
}

/// CPU construction options.
#[derive(Copy, Clone, Default, Debug)]
pub struct CpuOptions {
    /// CP/M compatibility mode: `OUT 0` halts, `OUT 1` is the BDOS console
    /// stub.
    pub cpm: bool,
    /// Trace every executed instruction through the `log` crate.
    pub debug: bool,
}

/// Serializable snapshot of the full register file, IO latches and the
/// shift-register peripheral. Field order is the stable save-state schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub pc: u16,
    pub sp: u16,
    pub cyc: u64,
    pub so: u8,
    pub sr: u16,
    pub interrupts: bool,
    pub io_ports: [u8; 8],
}

/// Intel 8080 interpreter.
///
/// Registers, flags and the arcade IO latches (input ports, shift register)
/// live here; memory and sound are reached through capability handles passed
/// to [`Cpu::step`].
pub struct Cpu {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub pc: u16,
    pub sp: u16,
    /// Total cycles executed since the last init.
    pub cyc: u64,
    /// Interrupt-enable latch (EI/DI).
    pub interrupts: bool,
    /// 16-bit hardware shift register (OUT 4 / IN 3).
    pub sr: u16,
    /// Shift offset for the IN 3 window (OUT 2, 3 bits).
    pub so: u8,
    /// Per-port latches: inputs for IN 0..2, last written value for OUT.
    pub io_ports: [u8; 8],
    /// Cleared by `OUT 0` in CP/M mode; the scheduler stops stepping once
    /// this goes false.
    pub running: bool,
    /// CP/M BDOS console bytes, drained by the host.
    console: Vec<u8>,
    cpm: bool,
    debug: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: 0,
            f: F_ALWAYS_ON,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            pc: 0,
            sp: 0,
            cyc: 0,
            interrupts: false,
            sr: 0,
            so: 0,
            io_ports: [0; 8],
            running: false,
            console: Vec::new(),
            cpm: false,
            debug: false,
        }
    }

    /// Reset the register file and start executing at `pc`.
    pub fn init(&mut self, pc: u16, options: CpuOptions) {
        self.a = 0;
        self.f = F_ALWAYS_ON;
        self.b = 0;
        self.c = 0;
        self.d = 0;
        self.e = 0;
        self.h = 0;
        self.l = 0;
        self.pc = pc;
        self.sp = 0;
        self.cyc = 0;
        self.interrupts = false;
        self.sr = 0;
        self.so = 0;
        self.io_ports = [0; 8];
        self.running = true;
        self.console.clear();
        self.cpm = options.cpm;
        self.debug = options.debug;
    }

    /// Set or clear one input-port bit (host key latches, DIP switches).
    pub fn send_input(&mut self, port: u8, bit: u8, value: bool) {
        let mask = 1u8 << bit;
        if value {
            self.io_ports[port as usize] |= mask;
        } else {
            self.io_ports[port as usize] &= !mask;
        }
    }

    /// Take the CP/M console bytes accumulated since the last drain.
    pub fn take_console(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.console)
    }

    /// Snapshot the register file for the save-state layer.
    pub fn save_state(&self) -> CpuState {
        CpuState {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            pc: self.pc,
            sp: self.sp,
            cyc: self.cyc,
            so: self.so,
            sr: self.sr,
            interrupts: self.interrupts,
            io_ports: self.io_ports,
        }
    }

    /// Restore a register-file snapshot. Mode flags (`cpm`, `debug`) and the
    /// running flag are not part of the state and stay as they are.
    pub fn load_state(&mut self, s: &CpuState) {
        self.a = s.a;
        self.set_f(s.f);
        self.b = s.b;
        self.c = s.c;
        self.d = s.d;
        self.e = s.e;
        self.h = s.h;
        self.l = s.l;
        self.pc = s.pc;
        self.sp = s.sp;
        self.cyc = s.cyc;
        self.so = s.so;
        self.sr = s.sr;
        self.interrupts = s.interrupts;
        self.io_ports = s.io_ports;
    }

    /// Deliver a maskable interrupt as `RST n`.
    ///
    /// Edge triggered: if the interrupt-enable latch is clear the request is
    /// discarded. Delivery clears the latch, pushes the resume address and
    /// vectors to `8 * n`. The effect is observed by the next `step`.
    pub fn request_interrupt<B: Bus + ?Sized>(&mut self, bus: &mut B, num: u8) {
        if !self.interrupts {
            return;
        }
        self.interrupts = false;
        self.push(bus, self.pc);
        self.pc = u16::from(num & 0x07) * 8;
    }

    /// Fetch, decode and execute one instruction; returns the cycles it
    /// consumed (base count plus 6 for taken conditional calls/returns).
    pub fn step<B, S>(&mut self, bus: &mut B, apu: &mut S) -> u8
    where
        B: Bus + ?Sized,
        S: SoundDispatch + ?Sized,
    {
        let opcode = bus.read(self.pc);
        let instr = &INSTRUCTIONS[opcode as usize];

        if self.debug {
            trace!(
                "{self} ({:02X} {:02X} {:02X}) {} {} {}",
                opcode,
                bus.read(self.pc.wrapping_add(1)),
                bus.read(self.pc.wrapping_add(2)),
                instr.mnemonic,
                instr.op1,
                instr.op2,
            );
        }

        let prev_pc = self.pc;
        let start_cyc = self.cyc;
        self.cyc += u64::from(instr.cycles);

        self.exec(bus, apu, opcode, instr);

        // Control-flow executors set PC themselves; everything else advances
        // by the encoded length.
        if self.pc == prev_pc {
            self.pc = self.pc.wrapping_add(u16::from(instr.length));
        }

        (self.cyc - start_cyc) as u8
    }

    fn exec<B, S>(&mut self, bus: &mut B, apu: &mut S, opcode: u8, instr: &Instr)
    where
        B: Bus + ?Sized,
        S: SoundDispatch + ?Sized,
    {
        match opcode {
            // NOP, including the undocumented duplicates.
            0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {}

            // LXI rp,d16
            0x01 | 0x11 | 0x21 | 0x31 => {
                let v = self.imm16(bus);
                self.set_rp(instr.op1, v);
            }
            // STAX / LDAX
            0x02 | 0x12 => {
                let addr = self.get_rp(instr.op1);
                bus.write(addr, self.a);
            }
            0x0A | 0x1A => {
                let addr = self.get_rp(instr.op1);
                self.a = bus.read(addr);
            }
            // INX / DCX (no flags)
            0x03 | 0x13 | 0x23 | 0x33 => {
                let v = self.get_rp(instr.op1).wrapping_add(1);
                self.set_rp(instr.op1, v);
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let v = self.get_rp(instr.op1).wrapping_sub(1);
                self.set_rp(instr.op1, v);
            }
            // INR / DCR
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let value = self.get_op(bus, instr.op1);
                let res = value.wrapping_add(1);
                self.set_op(bus, instr.op1, res);
                let cy = self.flag(F_CARRY);
                self.set_flags(
                    res & 0x80 != 0,
                    res == 0,
                    (value & 0x0F) + 1 > 0x0F,
                    parity(res),
                    cy,
                );
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let value = self.get_op(bus, instr.op1);
                let res = value.wrapping_sub(1);
                self.set_op(bus, instr.op1, res);
                let cy = self.flag(F_CARRY);
                self.set_flags(
                    res & 0x80 != 0,
                    res == 0,
                    value & 0x0F >= 1,
                    parity(res),
                    cy,
                );
            }
            // MVI r,d8
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let v = self.imm8(bus);
                self.set_op(bus, instr.op1, v);
            }
            // DAD rp
            0x09 | 0x19 | 0x29 | 0x39 => {
                let res = u32::from(self.hl()) + u32::from(self.get_rp(instr.op1));
                self.set_flag(F_CARRY, res > 0xFFFF);
                self.set_hl(res as u16);
            }

            // Rotates, A only.
            0x07 => {
                let sb = self.a >> 7;
                self.set_flag(F_CARRY, sb == 1);
                self.a = self.a << 1 | sb;
            }
            0x0F => {
                let sb = self.a & 0x01;
                self.set_flag(F_CARRY, sb == 1);
                self.a = self.a >> 1 | sb << 7;
            }
            0x17 => {
                let sb = self.a >> 7;
                self.a = self.a << 1 | self.carry_bit();
                self.set_flag(F_CARRY, sb == 1);
            }
            0x1F => {
                let sb = self.a & 0x01;
                self.a = self.a >> 1 | self.carry_bit() << 7;
                self.set_flag(F_CARRY, sb == 1);
            }

            // SHLD / LHLD / STA / LDA
            0x22 => {
                let addr = self.imm16(bus);
                bus.write(addr, self.l);
                bus.write(addr.wrapping_add(1), self.h);
            }
            0x2A => {
                let addr = self.imm16(bus);
                self.l = bus.read(addr);
                self.h = bus.read(addr.wrapping_add(1));
            }
            0x32 => {
                let addr = self.imm16(bus);
                bus.write(addr, self.a);
            }
            0x3A => {
                let addr = self.imm16(bus);
                self.a = bus.read(addr);
            }

            0x27 => self.daa(),
            0x2F => self.a = !self.a,
            0x37 => self.set_flag(F_CARRY, true),
            0x3F => {
                let cy = self.flag(F_CARRY);
                self.set_flag(F_CARRY, !cy);
            }

            // HLT. The arcade never executes it; treating it as a stall-free
            // no-op keeps the frame budget accounting simple.
            0x76 => {}

            // MOV dst,src
            0x40..=0x7F => {
                let v = self.get_op(bus, instr.op2);
                self.set_op(bus, instr.op1, v);
            }

            // Register/memory ALU group; op1 is the source operand.
            0x80..=0x87 => {
                let v = self.get_op(bus, instr.op1);
                self.add(v);
            }
            0x88..=0x8F => {
                let v = self.get_op(bus, instr.op1);
                self.adc(v);
            }
            0x90..=0x97 => {
                let v = self.get_op(bus, instr.op1);
                self.sub(v);
            }
            0x98..=0x9F => {
                let v = self.get_op(bus, instr.op1);
                self.sbb(v);
            }
            0xA0..=0xA7 => {
                let v = self.get_op(bus, instr.op1);
                self.ana(v);
            }
            0xA8..=0xAF => {
                let v = self.get_op(bus, instr.op1);
                self.xra(v);
            }
            0xB0..=0xB7 => {
                let v = self.get_op(bus, instr.op1);
                self.ora(v);
            }
            0xB8..=0xBF => {
                let v = self.get_op(bus, instr.op1);
                self.cmp(v);
            }

            // Immediate ALU group.
            0xC6 => {
                let v = self.imm8(bus);
                self.add(v);
            }
            0xCE => {
                let v = self.imm8(bus);
                self.adc(v);
            }
            0xD6 => {
                let v = self.imm8(bus);
                self.sub(v);
            }
            0xDE => {
                let v = self.imm8(bus);
                self.sbb(v);
            }
            0xE6 => {
                let v = self.imm8(bus);
                self.ana(v);
            }
            0xEE => {
                let v = self.imm8(bus);
                self.xra(v);
            }
            0xF6 => {
                let v = self.imm8(bus);
                self.ora(v);
            }
            0xFE => {
                let v = self.imm8(bus);
                self.cmp(v);
            }

            // Returns.
            0xC9 | 0xD9 => self.ret(bus),
            0xC0 => self.ret_cond(bus, !self.flag(F_ZERO)),
            0xC8 => self.ret_cond(bus, self.flag(F_ZERO)),
            0xD0 => self.ret_cond(bus, !self.flag(F_CARRY)),
            0xD8 => self.ret_cond(bus, self.flag(F_CARRY)),
            0xE0 => self.ret_cond(bus, !self.flag(F_PARITY)),
            0xE8 => self.ret_cond(bus, self.flag(F_PARITY)),
            0xF0 => self.ret_cond(bus, !self.flag(F_SIGN)),
            0xF8 => self.ret_cond(bus, self.flag(F_SIGN)),

            // Jumps (10 cycles taken or not).
            0xC3 | 0xCB => self.jump_cond(bus, true),
            0xC2 => self.jump_cond(bus, !self.flag(F_ZERO)),
            0xCA => self.jump_cond(bus, self.flag(F_ZERO)),
            0xD2 => self.jump_cond(bus, !self.flag(F_CARRY)),
            0xDA => self.jump_cond(bus, self.flag(F_CARRY)),
            0xE2 => self.jump_cond(bus, !self.flag(F_PARITY)),
            0xEA => self.jump_cond(bus, self.flag(F_PARITY)),
            0xF2 => self.jump_cond(bus, !self.flag(F_SIGN)),
            0xFA => self.jump_cond(bus, self.flag(F_SIGN)),

            // Calls.
            0xCD | 0xDD | 0xED | 0xFD => self.call(bus),
            0xC4 => self.call_cond(bus, !self.flag(F_ZERO)),
            0xCC => self.call_cond(bus, self.flag(F_ZERO)),
            0xD4 => self.call_cond(bus, !self.flag(F_CARRY)),
            0xDC => self.call_cond(bus, self.flag(F_CARRY)),
            0xE4 => self.call_cond(bus, !self.flag(F_PARITY)),
            0xEC => self.call_cond(bus, self.flag(F_PARITY)),
            0xF4 => self.call_cond(bus, !self.flag(F_SIGN)),
            0xFC => self.call_cond(bus, self.flag(F_SIGN)),

            // PUSH / POP
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let v = self.pop(bus);
                self.set_rp(instr.op1, v);
            }
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let v = self.get_rp(instr.op1);
                self.push(bus, v);
            }

            // RST n
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                let Operand::Rst(n) = instr.op1 else {
                    unreachable!("RST descriptor without a vector");
                };
                self.push(bus, self.pc.wrapping_add(1));
                self.pc = u16::from(n) * 8;
            }

            0xD3 => self.port_out(bus, apu),
            0xDB => self.port_in(bus),

            0xE3 => {
                let lo = bus.read(self.sp);
                let hi = bus.read(self.sp.wrapping_add(1));
                bus.write(self.sp, self.l);
                bus.write(self.sp.wrapping_add(1), self.h);
                self.l = lo;
                self.h = hi;
            }
            0xE9 => self.pc = self.hl(),
            0xEB => {
                std::mem::swap(&mut self.h, &mut self.d);
                std::mem::swap(&mut self.l, &mut self.e);
            }
            0xF9 => self.sp = self.hl(),

            0xF3 => self.interrupts = false,
            0xFB => self.interrupts = true,
        }
    }

    // --- flag access -----------------------------------------------------

    #[inline]
    fn flag(&self, mask: u8) -> bool {
        self.f & mask != 0
    }

    #[inline]
    fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.f |= mask;
        } else {
            self.f &= !mask;
        }
    }

    #[inline]
    fn carry_bit(&self) -> u8 {
        self.f & F_CARRY
    }

    /// Store F while keeping the wired bits: 5 and 3 read low, 1 reads high.
    #[inline]
    pub fn set_f(&mut self, v: u8) {
        self.f = (v & F_MASK) | F_ALWAYS_ON;
    }

    fn set_flags(&mut self, s: bool, z: bool, ac: bool, p: bool, cy: bool) {
        self.set_flag(F_SIGN, s);
        self.set_flag(F_ZERO, z);
        self.set_flag(F_AUX, ac);
        self.set_flag(F_PARITY, p);
        self.set_flag(F_CARRY, cy);
    }

    // --- register pairs --------------------------------------------------

    #[inline]
    fn hl(&self) -> u16 {
        u16::from(self.h) << 8 | u16::from(self.l)
    }

    #[inline]
    fn set_hl(&mut self, v: u16) {
        self.h = (v >> 8) as u8;
        self.l = v as u8;
    }

    fn get_rp(&self, op: Operand) -> u16 {
        match op {
            Operand::AF => u16::from(self.a) << 8 | u16::from(self.f),
            Operand::BC => u16::from(self.b) << 8 | u16::from(self.c),
            Operand::DE => u16::from(self.d) << 8 | u16::from(self.e),
            Operand::HL => self.hl(),
            Operand::SP => self.sp,
            _ => unreachable!("not a register pair: {op:?}"),
        }
    }

    fn set_rp(&mut self, op: Operand, v: u16) {
        match op {
            Operand::AF => {
                self.a = (v >> 8) as u8;
                self.set_f(v as u8);
            }
            Operand::BC => {
                self.b = (v >> 8) as u8;
                self.c = v as u8;
            }
            Operand::DE => {
                self.d = (v >> 8) as u8;
                self.e = v as u8;
            }
            Operand::HL => self.set_hl(v),
            Operand::SP => self.sp = v,
            _ => unreachable!("not a register pair: {op:?}"),
        }
    }

    fn get_op<B: Bus + ?Sized>(&mut self, bus: &mut B, op: Operand) -> u8 {
        match op {
            Operand::A => self.a,
            Operand::B => self.b,
            Operand::C => self.c,
            Operand::D => self.d,
            Operand::E => self.e,
            Operand::H => self.h,
            Operand::L => self.l,
            Operand::M => bus.read(self.hl()),
            _ => unreachable!("not a byte operand: {op:?}"),
        }
    }

    fn set_op<B: Bus + ?Sized>(&mut self, bus: &mut B, op: Operand, v: u8) {
        match op {
            Operand::A => self.a = v,
            Operand::B => self.b = v,
            Operand::C => self.c = v,
            Operand::D => self.d = v,
            Operand::E => self.e = v,
            Operand::H => self.h = v,
            Operand::L => self.l = v,
            Operand::M => bus.write(self.hl(), v),
            _ => unreachable!("not a byte operand: {op:?}"),
        }
    }

    // --- operand fetch ---------------------------------------------------

    #[inline]
    fn imm8<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        bus.read(self.pc.wrapping_add(1))
    }

    #[inline]
    fn imm16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.read(self.pc.wrapping_add(1));
        let hi = bus.read(self.pc.wrapping_add(2));
        u16::from(hi) << 8 | u16::from(lo)
    }

    // --- stack -----------------------------------------------------------

    fn push<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        bus.write(self.sp, value as u8);
        bus.write(self.sp.wrapping_add(1), (value >> 8) as u8);
    }

    fn pop<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = bus.read(self.sp);
        let hi = bus.read(self.sp.wrapping_add(1));
        self.sp = self.sp.wrapping_add(2);
        u16::from(hi) << 8 | u16::from(lo)
    }

    // --- control flow ----------------------------------------------------

    fn jump_cond<B: Bus + ?Sized>(&mut self, bus: &mut B, cond: bool) {
        let addr = self.imm16(bus);
        if cond {
            self.pc = addr;
        }
    }

    fn call<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let addr = self.imm16(bus);
        let ret = self.pc.wrapping_add(3);
        self.push(bus, ret);
        self.pc = addr;
    }

    fn call_cond<B: Bus + ?Sized>(&mut self, bus: &mut B, cond: bool) {
        if cond {
            self.call(bus);
            self.cyc += 6;
        }
    }

    fn ret<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.pc = self.pop(bus);
    }

    fn ret_cond<B: Bus + ?Sized>(&mut self, bus: &mut B, cond: bool) {
        if cond {
            self.ret(bus);
            self.cyc += 6;
        }
    }

    // --- ALU -------------------------------------------------------------

    fn add(&mut self, value: u8) {
        let a = self.a;
        let res = a.wrapping_add(value);
        self.set_flags(
            res & 0x80 != 0,
            res == 0,
            (a & 0x0F) + (value & 0x0F) > 0x0F,
            parity(res),
            u16::from(a) + u16::from(value) > 0xFF,
        );
        self.a = res;
    }

    fn adc(&mut self, value: u8) {
        let a = self.a;
        let carry = self.carry_bit();
        let res = a.wrapping_add(value).wrapping_add(carry);
        self.set_flags(
            res & 0x80 != 0,
            res == 0,
            (a & 0x0F) + (value & 0x0F) + carry > 0x0F,
            parity(res),
            u16::from(a) + u16::from(value) + u16::from(carry) > 0xFF,
        );
        self.a = res;
    }

    fn sub(&mut self, value: u8) {
        let a = self.a;
        let res = a.wrapping_sub(value);
        self.set_flags(
            res & 0x80 != 0,
            res == 0,
            a & 0x0F >= value & 0x0F,
            parity(res),
            u16::from(a) < u16::from(value),
        );
        self.a = res;
    }

    fn sbb(&mut self, value: u8) {
        let a = self.a;
        let carry = self.carry_bit();
        let res = a.wrapping_sub(value).wrapping_sub(carry);
        self.set_flags(
            res & 0x80 != 0,
            res == 0,
            a & 0x0F >= (value & 0x0F) + carry,
            parity(res),
            u16::from(a) < u16::from(value) + u16::from(carry),
        );
        self.a = res;
    }

    fn ana(&mut self, value: u8) {
        let res = self.a & value;
        self.set_flags(
            res & 0x80 != 0,
            res == 0,
            (self.a | value) & 0x08 != 0,
            parity(res),
            false,
        );
        self.a = res;
    }

    fn xra(&mut self, value: u8) {
        let res = self.a ^ value;
        self.set_flags(res & 0x80 != 0, res == 0, false, parity(res), false);
        self.a = res;
    }

    fn ora(&mut self, value: u8) {
        let res = self.a | value;
        self.set_flags(res & 0x80 != 0, res == 0, false, parity(res), false);
        self.a = res;
    }

    fn cmp(&mut self, value: u8) {
        let a = self.a;
        let res = a.wrapping_sub(value);
        self.set_flags(
            res & 0x80 != 0,
            res == 0,
            a & 0x0F >= value & 0x0F,
            parity(res),
            a < value,
        );
    }

    fn daa(&mut self) {
        let mut cy = self.flag(F_CARRY);
        let mut value: u8 = 0;

        if self.a & 0x0F > 0x09 || self.flag(F_AUX) {
            value += 0x06;
        }
        if self.a.wrapping_add(value) & 0xF0 > 0x90 || cy || self.a > 0x99 {
            value += 0x60;
            cy = true;
        }

        let res = self.a.wrapping_add(value);
        self.set_flags(
            res & 0x80 != 0,
            res == 0,
            (self.a & 0x0F) + (value & 0x0F) > 0x0F,
            parity(res),
            cy,
        );
        self.a = res;
    }

    // --- IO --------------------------------------------------------------

    fn port_in<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let port = self.imm8(bus);
        self.a = match port {
            3 => (self.sr >> (8 - self.so)) as u8,
            0..=7 => self.io_ports[port as usize],
            _ => {
                warn!("unimplemented in port: {port:02x}");
                0
            }
        };
    }

    fn port_out<B, S>(&mut self, bus: &mut B, apu: &mut S)
    where
        B: Bus + ?Sized,
        S: SoundDispatch + ?Sized,
    {
        let port = self.imm8(bus);
        match port {
            // CP/M harness: OUT 0 stops the test, OUT 1 is the BDOS stub.
            0 if self.cpm => self.running = false,
            1 if self.cpm => self.bdos(bus),
            2 => self.so = self.a & 0x07,
            3 => {
                let prev = self.io_ports[3];
                let rising = self.a & !prev;
                let falling = prev & !self.a;

                // Bit 0 is the looping UFO drone, the rest are one-shots.
                if rising & 0x01 != 0 {
                    apu.start_loop(apu::SOUND_UFO);
                }
                if falling & 0x01 != 0 {
                    apu.stop_loop(apu::SOUND_UFO);
                }
                if rising & 0x02 != 0 {
                    apu.play_once(apu::SOUND_SHOT);
                }
                if rising & 0x04 != 0 {
                    apu.play_once(apu::SOUND_PLAYER_DIE);
                }
                if rising & 0x08 != 0 {
                    apu.play_once(apu::SOUND_INVADER_DIE);
                }

                self.io_ports[3] = self.a;
            }
            4 => self.sr = u16::from(self.a) << 8 | self.sr >> 8,
            5 => {
                let rising = self.a & !self.io_ports[5];

                if rising & 0x01 != 0 {
                    apu.play_once(apu::SOUND_FLEET_1);
                }
                if rising & 0x02 != 0 {
                    apu.play_once(apu::SOUND_FLEET_2);
                }
                if rising & 0x04 != 0 {
                    apu.play_once(apu::SOUND_FLEET_3);
                }
                if rising & 0x08 != 0 {
                    apu.play_once(apu::SOUND_FLEET_4);
                }
                if rising & 0x10 != 0 {
                    apu.play_once(apu::SOUND_UFO_HIT);
                }

                self.io_ports[5] = self.a;
            }
            6 => {} // watchdog
            _ => warn!("unimplemented out port: {port:02x}"),
        }
    }

    /// CP/M BDOS console stub at 0x0005: C=2 prints the byte in E, C=9
    /// prints the `$`-terminated string at DE.
    fn bdos<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        match self.c {
            2 => self.console.push(self.e),
            9 => {
                let mut addr = u16::from(self.d) << 8 | u16::from(self.e);
                loop {
                    let b = bus.read(addr);
                    if b == b'$' {
                        break;
                    }
                    self.console.push(b);
                    addr = addr.wrapping_add(1);
                }
            }
            other => warn!("unimplemented out operation for port 1: {other:02x}"),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC: {:04X}, AF: {:04X}, BC: {:04X}, DE: {:04X}, HL: {:04X}, SP: {:04X}, CYC: {}",
            self.pc,
            u16::from(self.a) << 8 | u16::from(self.f),
            u16::from(self.b) << 8 | u16::from(self.c),
            u16::from(self.d) << 8 | u16::from(self.e),
            u16::from(self.h) << 8 | u16::from(self.l),
            self.sp,
            self.cyc,
        )
    }
}
