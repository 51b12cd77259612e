use crate::error::{DmgError, HeaderChecksumMismatchSnafu, RomTooSmallSnafu, UnsupportedMapperSnafu};
use crate::memory::mapper::mbc1::Mbc1;
use crate::memory::mapper::rom::Rom;
use crate::memory::mapper::Mapper;
use log::info;
use snafu::ensure;

const HEADER_START: usize = 0x0100;
const HEADER_END: usize = 0x0150;
const CHECKSUM_RANGE: std::ops::RangeInclusive<usize> = 0x0134..=0x014c;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub entry: [u8; 4],
    pub logo: [u8; 48],
    pub title: String,
    pub new_license_code: u16,
    pub sgb_flag: u8,
    pub mapper: u8,
    pub rom_size: u8,
    pub ram_size: u8,
    pub destination: u8,
    pub license_code: u8,
    pub version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
}

impl CartridgeHeader {
    pub fn parse(rom: &[u8]) -> Result<CartridgeHeader, DmgError> {
        ensure!(rom.len() >= HEADER_END, RomTooSmallSnafu { size: rom.len() });

        let header_checksum = rom[0x014d];
        let actual = CartridgeHeader::checksum(rom);
        ensure!(
            actual == header_checksum,
            HeaderChecksumMismatchSnafu {
                expected: header_checksum,
                actual,
            }
        );

        let mut entry = [0; 4];
        entry.copy_from_slice(&rom[HEADER_START..0x0104]);
        let mut logo = [0; 48];
        logo.copy_from_slice(&rom[0x0104..0x0134]);

        let title = rom[0x0134..0x0144]
            .iter()
            .take_while(|&&byte| byte != 0)
            .map(|&byte| byte as char)
            .collect::<String>();

        Ok(CartridgeHeader {
            entry,
            logo,
            title,
            new_license_code: u16::from_le_bytes([rom[0x0144], rom[0x0145]]),
            sgb_flag: rom[0x0146],
            mapper: rom[0x0147],
            rom_size: rom[0x0148],
            ram_size: rom[0x0149],
            destination: rom[0x014a],
            license_code: rom[0x014b],
            version: rom[0x014c],
            header_checksum,
            global_checksum: u16::from_le_bytes([rom[0x014e], rom[0x014f]]),
        })
    }

    /// x = x - byte - 1 over $0134-$014C, only the low byte is kept.
    pub fn checksum(rom: &[u8]) -> u8 {
        rom[CHECKSUM_RANGE]
            .iter()
            .fold(0u8, |checksum, &byte| checksum.wrapping_sub(byte).wrapping_sub(1))
    }

    pub fn mapper_name(&self) -> &'static str {
        match self.mapper {
            0x00 => "ROM ONLY",
            0x01 => "MBC1",
            0x02 => "MBC1+RAM",
            0x03 => "MBC1+RAM+BATTERY",
            0x08 => "ROM+RAM",
            0x09 => "ROM+RAM+BATTERY",
            _ => "UNSUPPORTED",
        }
    }
}

/// Validates the header and builds the mapper the cartridge type asks for.
pub fn load(rom: Vec<u8>) -> Result<Box<dyn Mapper>, DmgError> {
    let header = CartridgeHeader::parse(&rom)?;

    info!("Title: {}", header.title);
    info!(
        "Cartridge type: {} (${:02x}), ROM size code: ${:02x}, RAM size code: ${:02x}, version: {}",
        header.mapper_name(),
        header.mapper,
        header.rom_size,
        header.ram_size,
        header.version
    );

    let mapper: Box<dyn Mapper> = match header.mapper {
        0x00 => Box::new(Rom::new(rom)),
        0x08 | 0x09 => Box::new(Rom::with_ram(rom)),
        0x01..=0x03 => Box::new(Mbc1::new(rom)),
        mapper => return UnsupportedMapperSnafu { mapper }.fail(),
    };

    Ok(mapper)
}

#[cfg(test)]
pub(crate) fn build_rom(mapper: u8, title: &str, size: usize) -> Vec<u8> {
    let mut rom = vec![0u8; size.max(0x8000)];
    rom[0x0100..0x0104].copy_from_slice(&[0x00, 0xc3, 0x50, 0x01]);
    for (i, byte) in title.bytes().take(16).enumerate() {
        rom[0x0134 + i] = byte;
    }
    rom[0x0147] = mapper;
    rom[0x014d] = CartridgeHeader::checksum(&rom);
    rom
}
