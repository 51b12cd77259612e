use crate::error::{DecoderFailureSnafu, DmgError};
use crate::lr35902::irq::Vector;
use crate::lr35902::registers::{Flags, Register, Registers};
use crate::lr35902::sm83::{Condition, Sm83};
use crate::memory::mmu::Mmu;
use log::{debug, trace};
use snafu::OptionExt;

const INTERRUPT_CYCLES: usize = 20;
const HALTED_CYCLES: usize = 4;

#[derive(Clone)]
pub struct Cpu {
    sm83: Sm83,
    registers: Registers,
    ime: bool,
    halted: bool,
    halt_bug: bool,
    cycles: usize,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            sm83: Sm83::new(),
            registers: Registers::power_on(),
            ime: true,
            halted: false,
            halt_bug: false,
            cycles: 0,
        }
    }

    /// Runs one step: services an interrupt, idles while halted or executes
    /// one instruction. Returns the T-cycles consumed.
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<usize, DmgError> {
        let cycles = match self.service_interrupt(mmu) {
            Some(cycles) => cycles,
            None if self.halted => HALTED_CYCLES,
            None => self.execute(mmu)?,
        };

        self.cycles += cycles;
        Ok(cycles)
    }

    fn execute(&mut self, mmu: &mut Mmu) -> Result<usize, DmgError> {
        let address = self.registers.pc;
        let mut opcode = self.fetch(mmu);
        let prefixed = opcode == 0xcb;
        if prefixed {
            opcode = self.fetch(mmu);
        }

        let handler = self.sm83.decode(opcode, prefixed).context(DecoderFailureSnafu {
            opcode,
            address,
            prefixed,
        })?;

        trace!(
            "[${:04x}] {}{:02x}  {}",
            address,
            if prefixed { "cb " } else { "" },
            opcode,
            self
        );

        Ok(handler(self, mmu, opcode))
    }

    /// Only one interrupt is serviced per call. A pending interrupt always
    /// wakes the CPU, even when IME keeps it from being serviced.
    fn service_interrupt(&mut self, mmu: &mut Mmu) -> Option<usize> {
        let vector = Vector::from_flags(mmu.pending_interrupts())?;
        self.halted = false;

        if !self.ime {
            return None;
        }

        debug!("Servicing {} interrupt", vector);
        self.ime = false;
        mmu.clear_interrupt(vector.flag());
        let pc = self.registers.pc;
        self.push16(mmu, pc);
        self.registers.pc = vector.to_address();

        Some(INTERRUPT_CYCLES)
    }

    /// Reads the byte at PC and advances it, unless the halt bug swallows the increment.
    pub fn fetch(&mut self, mmu: &Mmu) -> u8 {
        let byte = mmu.read(self.registers.pc);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.registers.pc = self.registers.pc.wrapping_add(1);
        }
        byte
    }

    pub fn fetch16(&mut self, mmu: &Mmu) -> u16 {
        let lo = self.fetch(mmu);
        let hi = self.fetch(mmu);
        u16::from_le_bytes([lo, hi])
    }

    pub fn push16(&mut self, mmu: &mut Mmu, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        mmu.write(self.registers.sp, hi);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        mmu.write(self.registers.sp, lo);
    }

    pub fn pop16(&mut self, mmu: &Mmu) -> u16 {
        let lo = mmu.read(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(1);
        let hi = mmu.read(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    pub fn read_register(&self, register: Register) -> u8 {
        match register {
            Register::A => self.registers.a,
            Register::F => self.registers.f.bits(),
            Register::B => self.registers.b,
            Register::C => self.registers.c,
            Register::D => self.registers.d,
            Register::E => self.registers.e,
            Register::H => self.registers.h,
            Register::L => self.registers.l,
            wide => self.read_register16(wide) as u8,
        }
    }

    pub fn write_register(&mut self, register: Register, data: u8) {
        match register {
            Register::A => self.registers.a = data,
            Register::F => self.registers.f = Flags::from(data),
            Register::B => self.registers.b = data,
            Register::C => self.registers.c = data,
            Register::D => self.registers.d = data,
            Register::E => self.registers.e = data,
            Register::H => self.registers.h = data,
            Register::L => self.registers.l = data,
            wide => trace!("Ignoring 8-bit write to {:?}", wide),
        }
    }

    pub fn read_register16(&self, register: Register) -> u16 {
        match register {
            Register::AF => self.registers.af(),
            Register::BC => self.registers.bc(),
            Register::DE => self.registers.de(),
            Register::HL => self.registers.hl(),
            Register::SP => self.registers.sp,
            Register::PC => self.registers.pc,
            narrow => self.read_register(narrow) as u16,
        }
    }

    pub fn write_register16(&mut self, register: Register, value: u16) {
        match register {
            Register::AF => self.registers.set_af(value),
            Register::BC => self.registers.set_bc(value),
            Register::DE => self.registers.set_de(value),
            Register::HL => self.registers.set_hl(value),
            Register::SP => self.registers.sp = value,
            Register::PC => self.registers.pc = value,
            narrow => self.write_register(narrow, value as u8),
        }
    }

    /// 8-bit operand access where `Register::HL` means the byte at (HL).
    pub fn read_operand(&self, mmu: &Mmu, register: Register) -> u8 {
        match register {
            Register::HL => mmu.read(self.registers.hl()),
            register => self.read_register(register),
        }
    }

    pub fn write_operand(&mut self, mmu: &mut Mmu, register: Register, data: u8) {
        match register {
            Register::HL => mmu.write(self.registers.hl(), data),
            register => self.write_register(register, data),
        }
    }

    pub fn check_condition(&self, condition: Condition) -> bool {
        match condition {
            Condition::NZ => !self.registers.f.contains(Flags::ZERO),
            Condition::Z => self.registers.f.contains(Flags::ZERO),
            Condition::NC => !self.registers.f.contains(Flags::CARRY),
            Condition::C => self.registers.f.contains(Flags::CARRY),
        }
    }

    #[inline]
    pub fn flags(&self) -> Flags {
        self.registers.f
    }

    #[inline]
    pub fn set_flags(&mut self, flags: Flags) {
        self.registers.f = flags;
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn set_ime(&mut self, enabled: bool) {
        self.ime = enabled;
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    /// HALT with IME clear and an interrupt already pending does not halt;
    /// instead the next opcode fetch fails to advance PC.
    pub fn halt(&mut self, mmu: &Mmu) {
        if !self.ime && !mmu.pending_interrupts().is_empty() {
            debug!("HALT bug triggered at ${:04x}", self.registers.pc);
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}

impl std::fmt::Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "A: ${:02x}  F: ${:02x}  B: ${:02x}  C: ${:02x}  D: ${:02x}  E: ${:02x}  H: ${:02x}  L: ${:02x}  SP: ${:04x}  PC: ${:04x}  IME: {}{}",
            self.registers.a,
            self.registers.f.bits(),
            self.registers.b,
            self.registers.c,
            self.registers.d,
            self.registers.e,
            self.registers.h,
            self.registers.l,
            self.registers.sp,
            self.registers.pc,
            self.ime,
            if self.halted { "  HALTED" } else { "" }
        )
    }
}
