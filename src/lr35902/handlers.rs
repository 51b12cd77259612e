use crate::lr35902::alu;
use crate::lr35902::cpu::Cpu;
use crate::lr35902::registers::{Flags, Register};
use crate::lr35902::sm83::Sm83;
use crate::memory::mmu::Mmu;

const HIGH_PAGE: u16 = 0xff00;

pub struct Handlers {}

#[allow(unused_variables)]
impl Handlers {
    /// Cycle cost of an 8-bit operand instruction, where (HL) costs more.
    #[inline]
    fn cost(register: Register, direct: usize, indirect: usize) -> usize {
        if register == Register::HL {
            indirect
        } else {
            direct
        }
    }

    pub fn nop(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        4
    }

    /// The padding byte after STOP is consumed. No low-power mode.
    pub fn stop(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        cpu.fetch(mmu);
        4
    }

    pub fn halt(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        cpu.halt(mmu);
        4
    }

    pub fn di(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        cpu.set_ime(false);
        4
    }

    pub fn ei(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        cpu.set_ime(true);
        4
    }

    pub fn ld_r_r(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let dst = Sm83::lookup_register(opcode >> 3);
        let src = Sm83::lookup_register(opcode);
        let value = cpu.read_operand(mmu, src);
        cpu.write_operand(mmu, dst, value);

        if dst == Register::HL || src == Register::HL {
            8
        } else {
            4
        }
    }

    pub fn ld_r_d8(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let dst = Sm83::lookup_register(opcode >> 3);
        let value = cpu.fetch(mmu);
        cpu.write_operand(mmu, dst, value);
        Handlers::cost(dst, 8, 12)
    }

    pub fn ld_rr_d16(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let dst = Sm83::lookup_register_16(opcode >> 4);
        let value = cpu.fetch16(mmu);
        cpu.write_register16(dst, value);
        12
    }

    /// Address for LD (rr),A and LD A,(rr): BC, DE, HL+ or HL-.
    fn indirect_address(cpu: &mut Cpu, opcode: u8) -> u16 {
        let hl = cpu.read_register16(Register::HL);
        match (opcode >> 4) & 0b11 {
            0b00 => cpu.read_register16(Register::BC),
            0b01 => cpu.read_register16(Register::DE),
            0b10 => {
                cpu.write_register16(Register::HL, hl.wrapping_add(1));
                hl
            }
            _ => {
                cpu.write_register16(Register::HL, hl.wrapping_sub(1));
                hl
            }
        }
    }

    pub fn ld_indirect_a(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = Handlers::indirect_address(cpu, opcode);
        mmu.write(addr, cpu.read_register(Register::A));
        8
    }

    pub fn ld_a_indirect(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = Handlers::indirect_address(cpu, opcode);
        cpu.write_register(Register::A, mmu.read(addr));
        8
    }

    /// LDH (a8),A and LDH A,(a8); bit 4 selects the load direction.
    pub fn ldh_a8(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = HIGH_PAGE | cpu.fetch(mmu) as u16;
        Handlers::transfer_a(cpu, mmu, opcode, addr);
        12
    }

    /// LD (C),A and LD A,(C).
    pub fn ldh_c(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = HIGH_PAGE | cpu.read_register(Register::C) as u16;
        Handlers::transfer_a(cpu, mmu, opcode, addr);
        8
    }

    /// LD (a16),A and LD A,(a16).
    pub fn ld_a16(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.fetch16(mmu);
        Handlers::transfer_a(cpu, mmu, opcode, addr);
        16
    }

    fn transfer_a(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8, addr: u16) {
        if opcode & 0b0001_0000 == 0 {
            mmu.write(addr, cpu.read_register(Register::A));
        } else {
            cpu.write_register(Register::A, mmu.read(addr));
        }
    }

    pub fn ld_a16_sp(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.fetch16(mmu);
        mmu.write16(addr, cpu.read_register16(Register::SP));
        20
    }

    pub fn ld_sp_hl(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let hl = cpu.read_register16(Register::HL);
        cpu.write_register16(Register::SP, hl);
        8
    }

    pub fn ld_hl_sp_r8(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let offset = cpu.fetch(mmu);
        let (result, flags) = alu::add_sp(cpu.read_register16(Register::SP), offset);
        cpu.write_register16(Register::HL, result);
        cpu.set_flags(flags);
        12
    }

    pub fn add_sp_r8(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let offset = cpu.fetch(mmu);
        let (result, flags) = alu::add_sp(cpu.read_register16(Register::SP), offset);
        cpu.write_register16(Register::SP, result);
        cpu.set_flags(flags);
        16
    }

    pub fn push(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register_16_stack(opcode >> 4);
        let value = cpu.read_register16(register);
        cpu.push16(mmu, value);
        16
    }

    /// POP AF drops the low nibble of F through `write_register16`.
    pub fn pop(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register_16_stack(opcode >> 4);
        let value = cpu.pop16(mmu);
        cpu.write_register16(register, value);
        12
    }

    pub fn inc_rr(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register_16(opcode >> 4);
        let value = cpu.read_register16(register).wrapping_add(1);
        cpu.write_register16(register, value);
        8
    }

    pub fn dec_rr(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register_16(opcode >> 4);
        let value = cpu.read_register16(register).wrapping_sub(1);
        cpu.write_register16(register, value);
        8
    }

    pub fn add_hl_rr(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register_16(opcode >> 4);
        let (result, flags) = alu::add16(
            cpu.read_register16(Register::HL),
            cpu.read_register16(register),
            cpu.flags(),
        );
        cpu.write_register16(Register::HL, result);
        cpu.set_flags(flags);
        8
    }

    pub fn inc_r(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        Handlers::step_operand(cpu, mmu, opcode, alu::inc)
    }

    pub fn dec_r(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        Handlers::step_operand(cpu, mmu, opcode, alu::dec)
    }

    /// Shared by INC r / DEC r, including the (HL) forms.
    fn step_operand(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8, op: fn(u8, Flags) -> (u8, Flags)) -> usize {
        let register = Sm83::lookup_register(opcode >> 3);
        let (result, flags) = op(cpu.read_operand(mmu, register), cpu.flags());
        cpu.write_operand(mmu, register, result);
        cpu.set_flags(flags);
        Handlers::cost(register, 4, 12)
    }

    pub fn alu_r(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register(opcode);
        let value = cpu.read_operand(mmu, register);
        Handlers::alu(cpu, opcode >> 3, value);
        Handlers::cost(register, 4, 8)
    }

    pub fn alu_d8(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let value = cpu.fetch(mmu);
        Handlers::alu(cpu, opcode >> 3, value);
        8
    }

    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP against A, selected by bits 5-3.
    fn alu(cpu: &mut Cpu, operation: u8, value: u8) {
        let a = cpu.read_register(Register::A);
        let carry = cpu.flags().contains(Flags::CARRY);

        let (result, flags) = match operation & 0b111 {
            0 => alu::add(a, value, false),
            1 => alu::add(a, value, carry),
            2 => alu::sub(a, value, false),
            3 => alu::sub(a, value, carry),
            4 => alu::and(a, value),
            5 => alu::xor(a, value),
            6 => alu::or(a, value),
            _ => {
                let (_, flags) = alu::sub(a, value, false);
                (a, flags)
            }
        };

        cpu.write_register(Register::A, result);
        cpu.set_flags(flags);
    }

    pub fn daa(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let (result, flags) = alu::daa(cpu.read_register(Register::A), cpu.flags());
        cpu.write_register(Register::A, result);
        cpu.set_flags(flags);
        4
    }

    pub fn cpl(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let a = cpu.read_register(Register::A);
        cpu.write_register(Register::A, !a);
        cpu.set_flags(cpu.flags() | Flags::SUBTRACT | Flags::HALF_CARRY);
        4
    }

    pub fn scf(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        cpu.set_flags((cpu.flags() & Flags::ZERO) | Flags::CARRY);
        4
    }

    pub fn ccf(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let flags = cpu.flags();
        cpu.set_flags((flags & Flags::ZERO) | ((flags ^ Flags::CARRY) & Flags::CARRY));
        4
    }

    pub fn rlca(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        Handlers::rotate_a(cpu, |a, _| alu::rlc(a))
    }

    pub fn rrca(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        Handlers::rotate_a(cpu, |a, _| alu::rrc(a))
    }

    pub fn rla(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        Handlers::rotate_a(cpu, alu::rl)
    }

    pub fn rra(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        Handlers::rotate_a(cpu, alu::rr)
    }

    /// The accumulator rotates always clear Z.
    fn rotate_a(cpu: &mut Cpu, op: fn(u8, bool) -> (u8, Flags)) -> usize {
        let carry = cpu.flags().contains(Flags::CARRY);
        let (result, flags) = op(cpu.read_register(Register::A), carry);
        cpu.write_register(Register::A, result);
        cpu.set_flags(flags - Flags::ZERO);
        4
    }

    fn jump_relative(cpu: &mut Cpu, offset: u8) {
        let pc = cpu.read_register16(Register::PC);
        cpu.write_register16(Register::PC, pc.wrapping_add(offset as i8 as i16 as u16));
    }

    pub fn jr(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let offset = cpu.fetch(mmu);
        Handlers::jump_relative(cpu, offset);
        12
    }

    pub fn jr_cc(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let offset = cpu.fetch(mmu);
        if cpu.check_condition(Sm83::lookup_condition_2bits(opcode >> 3)) {
            Handlers::jump_relative(cpu, offset);
            12
        } else {
            8
        }
    }

    pub fn jp(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.fetch16(mmu);
        cpu.write_register16(Register::PC, addr);
        16
    }

    pub fn jp_cc(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.fetch16(mmu);
        if cpu.check_condition(Sm83::lookup_condition_2bits(opcode >> 3)) {
            cpu.write_register16(Register::PC, addr);
            16
        } else {
            12
        }
    }

    pub fn jp_hl(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let hl = cpu.read_register16(Register::HL);
        cpu.write_register16(Register::PC, hl);
        4
    }

    fn call_address(cpu: &mut Cpu, mmu: &mut Mmu, addr: u16) {
        let pc = cpu.read_register16(Register::PC);
        cpu.push16(mmu, pc);
        cpu.write_register16(Register::PC, addr);
    }

    pub fn call(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.fetch16(mmu);
        Handlers::call_address(cpu, mmu, addr);
        24
    }

    pub fn call_cc(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.fetch16(mmu);
        if cpu.check_condition(Sm83::lookup_condition_2bits(opcode >> 3)) {
            Handlers::call_address(cpu, mmu, addr);
            24
        } else {
            12
        }
    }

    pub fn rst(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        Handlers::call_address(cpu, mmu, (opcode & 0b0011_1000) as u16);
        16
    }

    pub fn ret(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.pop16(mmu);
        cpu.write_register16(Register::PC, addr);
        16
    }

    pub fn ret_cc(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        if cpu.check_condition(Sm83::lookup_condition_2bits(opcode >> 3)) {
            let addr = cpu.pop16(mmu);
            cpu.write_register16(Register::PC, addr);
            20
        } else {
            8
        }
    }

    pub fn reti(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let addr = cpu.pop16(mmu);
        cpu.write_register16(Register::PC, addr);
        cpu.set_ime(true);
        16
    }

    /// CB 00-3F: RLC, RRC, RL, RR, SLA, SRA, SWAP, SRL selected by bits 5-3.
    pub fn rotate_shift(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register(opcode);
        let value = cpu.read_operand(mmu, register);
        let carry = cpu.flags().contains(Flags::CARRY);

        let (result, flags) = match (opcode >> 3) & 0b111 {
            0 => alu::rlc(value),
            1 => alu::rrc(value),
            2 => alu::rl(value, carry),
            3 => alu::rr(value, carry),
            4 => alu::sla(value),
            5 => alu::sra(value),
            6 => alu::swap(value),
            _ => alu::srl(value),
        };

        cpu.write_operand(mmu, register, result);
        cpu.set_flags(flags);
        Handlers::cost(register, 8, 16)
    }

    pub fn bit(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register(opcode);
        let value = cpu.read_operand(mmu, register);
        cpu.set_flags(alu::bit((opcode >> 3) & 0b111, value, cpu.flags()));
        Handlers::cost(register, 8, 12)
    }

    pub fn res(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register(opcode);
        let value = cpu.read_operand(mmu, register) & !(1 << ((opcode >> 3) & 0b111));
        cpu.write_operand(mmu, register, value);
        Handlers::cost(register, 8, 16)
    }

    pub fn set(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> usize {
        let register = Sm83::lookup_register(opcode);
        let value = cpu.read_operand(mmu, register) | (1 << ((opcode >> 3) & 0b111));
        cpu.write_operand(mmu, register, value);
        Handlers::cost(register, 8, 16)
    }
}
