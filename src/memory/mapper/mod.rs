use dyn_clone::DynClone;

pub mod mbc1;
pub mod rom;

/// Cartridge-side view of the bus. Receives every access in `0x0000..=0x7fff` and
/// `0xa000..=0xbfff`; anything the mapper does not back reads as open bus.
pub trait Mapper: DynClone {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
    fn current_rom_bank(&self) -> u8;
    fn current_ram_bank(&self) -> u8;
    fn name(&self) -> String;
}

dyn_clone::clone_trait_object!(Mapper);

/// Number of 16 KiB banks in an image, never zero.
pub(crate) fn rom_bank_count(rom: &[u8]) -> usize {
    rom.len().div_ceil(0x4000).max(1)
}
