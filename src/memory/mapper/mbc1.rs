use crate::memory::mapper::{rom_bank_count, Mapper};
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, OPEN_BUS};
use log::{debug, trace};

const RAM_ENABLE_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x1fff;
const ROM_BANK_RANGE: std::ops::RangeInclusive<u16> = 0x2000..=0x3fff;
const SECONDARY_BANK_REGISTER: std::ops::RangeInclusive<u16> = 0x4000..=0x5fff;
const BANKING_MODE_REGISTER: std::ops::RangeInclusive<u16> = 0x6000..=0x7fff;
const ROM_SLOT_0_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x3fff;
const ROM_SLOT_1_RANGE: std::ops::RangeInclusive<u16> = 0x4000..=0x7fff;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;
const RAM_SIZE: usize = 4 * RAM_BANK_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankingMode {
    Rom,
    Ram,
}

#[derive(Clone)]
pub struct Mbc1 {
    rom: Vec<u8>,
    rom_bank: u8,
    ram: Vec<u8>,
    ram_bank: u8,
    ram_enabled: bool,
    banking_mode: BankingMode,
}

impl Mbc1 {
    pub fn new(memory: Vec<u8>) -> Mbc1 {
        Mbc1 {
            rom: memory,
            rom_bank: 1,
            ram: vec![0; RAM_SIZE],
            ram_bank: 0,
            ram_enabled: false,
            banking_mode: BankingMode::Rom,
        }
    }

    pub fn banking_mode(&self) -> BankingMode {
        self.banking_mode
    }

    pub fn ram_enabled(&self) -> bool {
        self.ram_enabled
    }

    /// Bank 0 can't be selected for the switchable slot. The same applies to every
    /// bank whose lower five bits are zero, so $20/$40/$60 turn into $21/$41/$61.
    #[inline]
    fn fix_rom_bank(bank: u8) -> u8 {
        if bank & 0b0001_1111 == 0 {
            bank + 1
        } else {
            bank
        }
    }

    /// Only RAM bank 0 is reachable in ROM banking mode.
    #[inline]
    fn active_ram_bank(&self) -> u8 {
        match self.banking_mode {
            BankingMode::Rom => 0,
            BankingMode::Ram => self.ram_bank,
        }
    }

    #[inline]
    fn ram_offset(&self, addr: u16) -> usize {
        (addr - EXTERNAL_RAM_START) as usize + (self.active_ram_bank() as usize * RAM_BANK_SIZE)
    }
}

impl Mapper for Mbc1 {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            addr if ROM_SLOT_0_RANGE.contains(&addr) => self.rom.get(addr as usize).copied().unwrap_or(OPEN_BUS),
            addr if ROM_SLOT_1_RANGE.contains(&addr) => {
                let bank = self.rom_bank as usize % rom_bank_count(&self.rom);
                let addr = (addr as usize % ROM_BANK_SIZE) + (bank * ROM_BANK_SIZE);
                self.rom.get(addr).copied().unwrap_or(OPEN_BUS)
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if self.ram_enabled {
                    self.ram[self.ram_offset(addr)]
                } else {
                    OPEN_BUS
                }
            }
            _ => OPEN_BUS,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            addr if RAM_ENABLE_RANGE.contains(&addr) => {
                self.ram_enabled = data == 0x0a;
                debug!("MBC1: RAM enabled: {}", self.ram_enabled);
            }
            addr if ROM_BANK_RANGE.contains(&addr) => {
                // This 5-bit register selects the lower bits of the ROM bank for the 4000–7FFF region.
                // Higher bits are discarded, writing $E1 (binary 11100001) to this register would select bank $01.
                self.rom_bank = Mbc1::fix_rom_bank((self.rom_bank & 0b0110_0000) | (data & 0b0001_1111));
                debug!("MBC1: Switched to ROM bank {}", self.rom_bank);
            }
            addr if SECONDARY_BANK_REGISTER.contains(&addr) => match self.banking_mode {
                BankingMode::Rom => {
                    // Upper two bits (bits 5-6) of the ROM bank number.
                    self.rom_bank = Mbc1::fix_rom_bank((self.rom_bank & 0b0001_1111) | ((data & 0b11) << 5));
                    debug!("MBC1: Switched to ROM bank {}", self.rom_bank);
                }
                BankingMode::Ram => {
                    self.ram_bank = data & 0b11;
                    debug!("MBC1: Switched to RAM bank {}", self.ram_bank);
                }
            },
            addr if BANKING_MODE_REGISTER.contains(&addr) => {
                self.banking_mode = if data & 0b0000_0001 == 1 {
                    BankingMode::Ram
                } else {
                    BankingMode::Rom
                };
                debug!("MBC1: Switched to banking mode: {:?}", self.banking_mode);
            }
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if self.ram_enabled {
                    let offset = self.ram_offset(addr);
                    self.ram[offset] = data;
                } else {
                    trace!("MBC1: dropped write to disabled RAM at ${:04x}", addr);
                }
            }
            _ => trace!("MBC1: dropped write of {:02x} to ${:04x}", data, addr),
        }
    }

    #[inline]
    fn current_rom_bank(&self) -> u8 {
        self.rom_bank
    }

    #[inline]
    fn current_ram_bank(&self) -> u8 {
        self.active_ram_bank()
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 128 banks, each filled with its own index.
    fn banked_rom() -> Vec<u8> {
        (0..128u8).flat_map(|bank| std::iter::repeat(bank).take(ROM_BANK_SIZE)).collect()
    }

    #[test]
    fn bank_zero_selects_bank_one() {
        let mut mbc = Mbc1::new(banked_rom());
        mbc.write(0x2000, 0x00);
        assert_eq!(mbc.current_rom_bank(), 1);
        assert_eq!(mbc.read(0x4000), 1);
    }

    #[test]
    fn aliased_banks_resolve_to_next_bank() {
        for (upper, expected) in [(0u8, 0x01u8), (1, 0x21), (2, 0x41), (3, 0x61)] {
            let mut mbc = Mbc1::new(banked_rom());
            mbc.write(0x4000, upper);
            mbc.write(0x2000, 0x00);
            assert_eq!(mbc.current_rom_bank(), expected);
            assert_eq!(mbc.read(0x4000), expected);
            assert_eq!(mbc.read(0x7fff), expected);
        }
    }

    #[test]
    fn low_register_masks_to_five_bits() {
        let mut mbc = Mbc1::new(banked_rom());
        mbc.write(0x2000, 0xe1);
        assert_eq!(mbc.current_rom_bank(), 0x01);
        mbc.write(0x3fff, 0x1f);
        assert_eq!(mbc.current_rom_bank(), 0x1f);
        assert_eq!(mbc.read(0x4000), 0x1f);
    }

    #[test]
    fn bank_zero_is_always_mapped_low() {
        let mut mbc = Mbc1::new(banked_rom());
        mbc.write(0x2000, 0x05);
        assert_eq!(mbc.read(0x0000), 0);
        assert_eq!(mbc.read(0x3fff), 0);
    }

    #[test]
    fn oversized_bank_wraps_around_image() {
        // 4 banks only, bank 5 wraps to bank 1
        let rom: Vec<u8> = (0..4u8).flat_map(|bank| std::iter::repeat(bank).take(ROM_BANK_SIZE)).collect();
        let mut mbc = Mbc1::new(rom);
        mbc.write(0x2000, 0x05);
        assert_eq!(mbc.read(0x4000), 1);
    }

    #[test]
    fn ram_requires_enable() {
        let mut mbc = Mbc1::new(banked_rom());
        mbc.write(0xa000, 0x42);
        assert_eq!(mbc.read(0xa000), OPEN_BUS);

        mbc.write(0x0000, 0x0a);
        assert!(mbc.ram_enabled());
        mbc.write(0xa000, 0x42);
        assert_eq!(mbc.read(0xa000), 0x42);

        mbc.write(0x1fff, 0x00);
        assert!(!mbc.ram_enabled());
        assert_eq!(mbc.read(0xa000), OPEN_BUS);
    }

    #[test]
    fn ram_banking_mode_selects_ram_bank() {
        let mut mbc = Mbc1::new(banked_rom());
        mbc.write(0x0000, 0x0a);
        mbc.write(0x6000, 0x01);
        assert_eq!(mbc.banking_mode(), BankingMode::Ram);

        mbc.write(0x4000, 0x02);
        assert_eq!(mbc.current_ram_bank(), 2);
        assert_eq!(mbc.current_rom_bank(), 1);
        mbc.write(0xb000, 0x77);

        mbc.write(0x4000, 0x00);
        assert_eq!(mbc.read(0xb000), 0x00);
        mbc.write(0x4000, 0x02);
        assert_eq!(mbc.read(0xb000), 0x77);
    }

    #[test]
    fn ram_enable_needs_exact_value() {
        let mut mbc = Mbc1::new(banked_rom());
        for value in [0x1a, 0x2a, 0xfa, 0x0b] {
            mbc.write(0x0000, value);
            assert!(!mbc.ram_enabled(), "{:02x} enabled external RAM", value);
        }

        mbc.write(0x0000, 0x0a);
        assert!(mbc.ram_enabled());
        mbc.write(0x0000, 0x1a);
        assert!(!mbc.ram_enabled());
    }

    #[test]
    fn rom_banking_mode_pins_ram_bank_zero() {
        let mut mbc = Mbc1::new(banked_rom());
        mbc.write(0x0000, 0x0a);
        mbc.write(0xa000, 0x11);

        mbc.write(0x6000, 0x01);
        mbc.write(0x4000, 0x03);
        mbc.write(0xa000, 0x33);
        assert_eq!(mbc.current_ram_bank(), 3);

        mbc.write(0x6000, 0x00);
        assert_eq!(mbc.current_ram_bank(), 0);
        assert_eq!(mbc.read(0xa000), 0x11);

        mbc.write(0x6000, 0x01);
        assert_eq!(mbc.read(0xa000), 0x33);
    }
}
