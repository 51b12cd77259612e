//! Flag arithmetic shared by the instruction handlers. Every function is pure:
//! it takes the operands (and the current flags where some survive) and returns
//! the result together with the new flag set.

use crate::lr35902::registers::Flags;

#[inline]
fn zero(value: u8) -> Flags {
    if value == 0 {
        Flags::ZERO
    } else {
        Flags::empty()
    }
}

pub fn add(a: u8, b: u8, carry: bool) -> (u8, Flags) {
    let carry = carry as u8;
    let sum = a as u16 + b as u16 + carry as u16;
    let result = sum as u8;

    let mut flags = zero(result);
    flags.set(Flags::HALF_CARRY, (a & 0x0f) + (b & 0x0f) + carry > 0x0f);
    flags.set(Flags::CARRY, sum > 0xff);
    (result, flags)
}

pub fn sub(a: u8, b: u8, carry: bool) -> (u8, Flags) {
    let carry = carry as u8;
    let result = a.wrapping_sub(b).wrapping_sub(carry);

    let mut flags = zero(result) | Flags::SUBTRACT;
    flags.set(Flags::HALF_CARRY, (a & 0x0f) < (b & 0x0f) + carry);
    flags.set(Flags::CARRY, (a as u16) < b as u16 + carry as u16);
    (result, flags)
}

pub fn and(a: u8, b: u8) -> (u8, Flags) {
    let result = a & b;
    (result, zero(result) | Flags::HALF_CARRY)
}

pub fn or(a: u8, b: u8) -> (u8, Flags) {
    let result = a | b;
    (result, zero(result))
}

pub fn xor(a: u8, b: u8) -> (u8, Flags) {
    let result = a ^ b;
    (result, zero(result))
}

/// Carry is not affected.
pub fn inc(value: u8, flags: Flags) -> (u8, Flags) {
    let result = value.wrapping_add(1);
    let mut new = zero(result) | (flags & Flags::CARRY);
    new.set(Flags::HALF_CARRY, value & 0x0f == 0x0f);
    (result, new)
}

/// Carry is not affected.
pub fn dec(value: u8, flags: Flags) -> (u8, Flags) {
    let result = value.wrapping_sub(1);
    let mut new = zero(result) | Flags::SUBTRACT | (flags & Flags::CARRY);
    new.set(Flags::HALF_CARRY, value & 0x0f == 0);
    (result, new)
}

/// ADD HL,rr. Zero is kept, half carry comes from bit 11.
pub fn add16(hl: u16, value: u16, flags: Flags) -> (u16, Flags) {
    let (result, carry) = hl.overflowing_add(value);
    let mut new = flags & Flags::ZERO;
    new.set(Flags::HALF_CARRY, (hl & 0x0fff) + (value & 0x0fff) > 0x0fff);
    new.set(Flags::CARRY, carry);
    (result, new)
}

/// SP plus a signed byte. Flags are computed on the unsigned low byte.
pub fn add_sp(sp: u16, offset: u8) -> (u16, Flags) {
    let result = sp.wrapping_add(offset as i8 as i16 as u16);
    let mut flags = Flags::empty();
    flags.set(Flags::HALF_CARRY, (sp & 0x0f) + (offset as u16 & 0x0f) > 0x0f);
    flags.set(Flags::CARRY, (sp & 0xff) + offset as u16 > 0xff);
    (result, flags)
}

pub fn daa(a: u8, flags: Flags) -> (u8, Flags) {
    let mut result = a;
    let mut carry = flags.contains(Flags::CARRY);

    if !flags.contains(Flags::SUBTRACT) {
        if carry || result > 0x99 {
            result = result.wrapping_add(0x60);
            carry = true;
        }
        if flags.contains(Flags::HALF_CARRY) || (result & 0x0f) > 0x09 {
            result = result.wrapping_add(0x06);
        }
    } else {
        if carry {
            result = result.wrapping_sub(0x60);
        }
        if flags.contains(Flags::HALF_CARRY) {
            result = result.wrapping_sub(0x06);
        }
    }

    let mut new = zero(result) | (flags & Flags::SUBTRACT);
    new.set(Flags::CARRY, carry);
    (result, new)
}

#[inline]
fn shifted(result: u8, carry: bool) -> (u8, Flags) {
    let mut flags = zero(result);
    flags.set(Flags::CARRY, carry);
    (result, flags)
}

pub fn rlc(value: u8) -> (u8, Flags) {
    shifted(value.rotate_left(1), value & 0x80 != 0)
}

pub fn rrc(value: u8) -> (u8, Flags) {
    shifted(value.rotate_right(1), value & 0x01 != 0)
}

pub fn rl(value: u8, carry: bool) -> (u8, Flags) {
    shifted((value << 1) | carry as u8, value & 0x80 != 0)
}

pub fn rr(value: u8, carry: bool) -> (u8, Flags) {
    shifted((value >> 1) | ((carry as u8) << 7), value & 0x01 != 0)
}

pub fn sla(value: u8) -> (u8, Flags) {
    shifted(value << 1, value & 0x80 != 0)
}

pub fn sra(value: u8) -> (u8, Flags) {
    shifted((value >> 1) | (value & 0x80), value & 0x01 != 0)
}

pub fn srl(value: u8) -> (u8, Flags) {
    shifted(value >> 1, value & 0x01 != 0)
}

pub fn swap(value: u8) -> (u8, Flags) {
    shifted(value.rotate_left(4), false)
}

/// BIT n. Carry is kept.
pub fn bit(n: u8, value: u8, flags: Flags) -> Flags {
    zero(value & (1 << n)) | Flags::HALF_CARRY | (flags & Flags::CARRY)
}
