use crate::lr35902::cpu::Cpu;
use crate::lr35902::handlers::Handlers;
use crate::lr35902::registers::Register;
use crate::memory::mmu::Mmu;

/// Executes one decoded instruction and returns the T-cycles it took. The
/// opcode byte is passed along so a handler can pull its operands out of it.
pub type Handler = fn(&mut Cpu, &mut Mmu, u8) -> usize;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Condition {
    NZ,
    Z,
    NC,
    C,
}

macro_rules! define_decoder {
    ( $pattern:expr, $handler:expr ) => {{
        ($pattern, $handler as Handler)
    }};
}

#[derive(Clone)]
pub struct Sm83 {
    lut: [Option<Handler>; 256],
    lut_prefixed: [Option<Handler>; 256],
}

impl Sm83 {
    pub fn new() -> Sm83 {
        Sm83 {
            lut: Sm83::build_lut(&Sm83::decoders()),
            lut_prefixed: Sm83::build_lut(&Sm83::decoders_prefixed()),
        }
    }

    #[inline]
    pub fn decode(&self, opcode: u8, prefixed: bool) -> Option<Handler> {
        if prefixed {
            self.lut_prefixed[opcode as usize]
        } else {
            self.lut[opcode as usize]
        }
    }

    /// Expands the bit patterns into a flat table. The first pattern that
    /// matches an opcode wins, so more specific patterns go first.
    fn build_lut(decoders: &[(&'static str, Handler)]) -> [Option<Handler>; 256] {
        let mut lut: [Option<Handler>; 256] = [None; 256];
        for (opcode, entry) in lut.iter_mut().enumerate() {
            *entry = decoders
                .iter()
                .find(|(pattern, _)| Sm83::matches(pattern, opcode as u8))
                .map(|(_, handler)| *handler);
        }
        lut
    }

    fn matches(pattern: &str, opcode: u8) -> bool {
        pattern.len() == 8
            && pattern.bytes().enumerate().all(|(i, c)| {
                let bit = (opcode >> (7 - i)) & 1;
                match c {
                    b'x' => true,
                    b'0' => bit == 0,
                    b'1' => bit == 1,
                    _ => false,
                }
            })
    }

    fn decoders() -> Vec<(&'static str, Handler)> {
        vec![
            define_decoder!("00000000", Handlers::nop),
            define_decoder!("00010000", Handlers::stop),
            define_decoder!("00001000", Handlers::ld_a16_sp),
            define_decoder!("00011000", Handlers::jr),
            define_decoder!("001xx000", Handlers::jr_cc),
            define_decoder!("00xx0001", Handlers::ld_rr_d16),
            define_decoder!("00xx1001", Handlers::add_hl_rr),
            define_decoder!("00xx0010", Handlers::ld_indirect_a),
            define_decoder!("00xx1010", Handlers::ld_a_indirect),
            define_decoder!("00xx0011", Handlers::inc_rr),
            define_decoder!("00xx1011", Handlers::dec_rr),
            define_decoder!("00xxx100", Handlers::inc_r),
            define_decoder!("00xxx101", Handlers::dec_r),
            define_decoder!("00xxx110", Handlers::ld_r_d8),
            define_decoder!("00000111", Handlers::rlca),
            define_decoder!("00001111", Handlers::rrca),
            define_decoder!("00010111", Handlers::rla),
            define_decoder!("00011111", Handlers::rra),
            define_decoder!("00100111", Handlers::daa),
            define_decoder!("00101111", Handlers::cpl),
            define_decoder!("00110111", Handlers::scf),
            define_decoder!("00111111", Handlers::ccf),
            define_decoder!("01110110", Handlers::halt),
            define_decoder!("01xxxxxx", Handlers::ld_r_r),
            define_decoder!("10xxxxxx", Handlers::alu_r),
            define_decoder!("11xxx110", Handlers::alu_d8),
            define_decoder!("110xx000", Handlers::ret_cc),
            define_decoder!("11001001", Handlers::ret),
            define_decoder!("11011001", Handlers::reti),
            define_decoder!("11xx0001", Handlers::pop),
            define_decoder!("11xx0101", Handlers::push),
            define_decoder!("110xx010", Handlers::jp_cc),
            define_decoder!("11000011", Handlers::jp),
            define_decoder!("11101001", Handlers::jp_hl),
            define_decoder!("110xx100", Handlers::call_cc),
            define_decoder!("11001101", Handlers::call),
            define_decoder!("11xxx111", Handlers::rst),
            define_decoder!("111x0000", Handlers::ldh_a8),
            define_decoder!("111x0010", Handlers::ldh_c),
            define_decoder!("111x1010", Handlers::ld_a16),
            define_decoder!("11101000", Handlers::add_sp_r8),
            define_decoder!("11111000", Handlers::ld_hl_sp_r8),
            define_decoder!("11111001", Handlers::ld_sp_hl),
            define_decoder!("11110011", Handlers::di),
            define_decoder!("11111011", Handlers::ei),
        ]
    }

    fn decoders_prefixed() -> Vec<(&'static str, Handler)> {
        vec![
            define_decoder!("00xxxxxx", Handlers::rotate_shift),
            define_decoder!("01xxxxxx", Handlers::bit),
            define_decoder!("10xxxxxx", Handlers::res),
            define_decoder!("11xxxxxx", Handlers::set),
        ]
    }

    /// Code 0b110 stands for the byte at (HL).
    pub fn lookup_register(data: u8) -> Register {
        match data & 0b111 {
            0b000 => Register::B,
            0b001 => Register::C,
            0b010 => Register::D,
            0b011 => Register::E,
            0b100 => Register::H,
            0b101 => Register::L,
            0b110 => Register::HL,
            _ => Register::A,
        }
    }

    pub fn lookup_register_16(data: u8) -> Register {
        match data & 0b11 {
            0b00 => Register::BC,
            0b01 => Register::DE,
            0b10 => Register::HL,
            _ => Register::SP,
        }
    }

    /// PUSH and POP use AF where the other 16-bit groups use SP.
    pub fn lookup_register_16_stack(data: u8) -> Register {
        match data & 0b11 {
            0b00 => Register::BC,
            0b01 => Register::DE,
            0b10 => Register::HL,
            _ => Register::AF,
        }
    }

    pub fn lookup_condition_2bits(data: u8) -> Condition {
        match data & 0b11 {
            0b00 => Condition::NZ,
            0b01 => Condition::Z,
            0b10 => Condition::NC,
            _ => Condition::C,
        }
    }
}

impl Default for Sm83 {
    fn default() -> Sm83 {
        Sm83::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ILLEGAL_OPCODES: [u8; 11] = [0xd3, 0xdb, 0xdd, 0xe3, 0xe4, 0xeb, 0xec, 0xed, 0xf4, 0xfc, 0xfd];

    #[test]
    fn only_illegal_opcodes_are_missing() {
        let sm83 = Sm83::new();
        for opcode in 0..=0xffu8 {
            let decoded = sm83.decode(opcode, false).is_some();
            let expected = !ILLEGAL_OPCODES.contains(&opcode) && opcode != 0xcb;
            assert_eq!(decoded, expected, "opcode {:02x}", opcode);
            assert!(sm83.decode(opcode, true).is_some(), "cb {:02x}", opcode);
        }
    }

    #[test]
    fn pattern_matching() {
        assert!(Sm83::matches("01xxxxxx", 0x40));
        assert!(!Sm83::matches("01xxxxxx", 0x80));
        assert!(Sm83::matches("11xx0101", 0xf5));
        assert!(!Sm83::matches("0101", 0x05));
    }
}
