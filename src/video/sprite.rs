use crate::memory::mmu::Mmu;
use crate::video::OAM_ADDRESS;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpriteAttributes: u8 {
        const PALETTE   = 0b0001_0000;
        const FLIP_X    = 0b0010_0000;
        const FLIP_Y    = 0b0100_0000;
        const PRIORITY  = 0b1000_0000;
    }
}

pub struct Sprite {
    pub x: u8,
    pub y: u8,
    pub tile_index: u8,
    pub attributes: SpriteAttributes,
}

impl Sprite {
    pub fn from_oam(mmu: &Mmu, index: u16) -> Self {
        let sprite_addr = OAM_ADDRESS + (index * 4);

        Sprite {
            y: mmu.read(sprite_addr),
            x: mmu.read(sprite_addr + 1),
            tile_index: mmu.read(sprite_addr + 2),
            attributes: SpriteAttributes::from_bits_truncate(mmu.read(sprite_addr + 3)),
        }
    }

    /// Tile line to draw on `scanline`, with vertical flip applied, or None if
    /// the sprite does not cover it.
    pub fn line_on_scanline(&self, scanline: usize, height: usize) -> Option<usize> {
        let top = self.y as isize - 16;
        let line = scanline as isize - top;
        if line < 0 || line >= height as isize {
            return None;
        }

        let line = line as usize;
        if self.attributes.contains(SpriteAttributes::FLIP_Y) {
            Some(height - 1 - line)
        } else {
            Some(line)
        }
    }

    /// In 8x16 mode the low bit of the tile index is ignored.
    pub fn tile_index(&self, height: usize) -> u8 {
        if height == 16 {
            self.tile_index & 0xfe
        } else {
            self.tile_index
        }
    }
}
