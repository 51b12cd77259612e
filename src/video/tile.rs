use crate::memory::mmu::Mmu;
use crate::video::{TILESET_0_ADDRESS, TILESET_1_ADDRESS};

/// One 8-pixel row of a tile, as stored in VRAM: low bit-plane first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileRow {
    lo: u8,
    hi: u8,
}

impl TileRow {
    pub fn fetch(mmu: &Mmu, tile_address: u16, line: u8) -> TileRow {
        let address = tile_address.wrapping_add(line as u16 * 2);
        TileRow {
            lo: mmu.read(address),
            hi: mmu.read(address.wrapping_add(1)),
        }
    }

    /// 2-bit color index of pixel `x`, counted from the left.
    pub fn color(&self, x: u8) -> u8 {
        let bit = 7 - (x & 7);
        (((self.hi >> bit) & 1) << 1) | ((self.lo >> bit) & 1)
    }
}

/// Background and window tile data: ids index up from $8000, or signed around $9000.
pub fn tile_data_address(tile_id: u8, unsigned_addressing: bool) -> u16 {
    if unsigned_addressing {
        TILESET_0_ADDRESS + tile_id as u16 * 16
    } else {
        TILESET_1_ADDRESS.wrapping_add((tile_id as i8 as i16 * 16) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_addressing() {
        assert_eq!(tile_data_address(0x00, false), 0x9000);
        assert_eq!(tile_data_address(0x7f, false), 0x97f0);
        assert_eq!(tile_data_address(0x80, false), 0x8800);
        assert_eq!(tile_data_address(0xff, false), 0x8ff0);
        assert_eq!(tile_data_address(0xff, true), 0x8ff0);
        assert_eq!(tile_data_address(0x01, true), 0x8010);
    }

    #[test]
    fn color_combines_bit_planes() {
        let row = TileRow { lo: 0b1010_0000, hi: 0b1100_0000 };
        assert_eq!(row.color(0), 0b11);
        assert_eq!(row.color(1), 0b10);
        assert_eq!(row.color(2), 0b01);
        assert_eq!(row.color(3), 0b00);
    }
}
