#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Shade {
    #[default]
    White,
    LightGray,
    DarkGray,
    Black,
}

impl Shade {
    /// Maps a 2-bit color index through a BGP/OBP0/OBP1 palette register.
    pub fn from_palette(palette: u8, color: u8) -> Shade {
        match (palette >> ((color & 0b11) * 2)) & 0b11 {
            0b00 => Shade::White,
            0b01 => Shade::LightGray,
            0b10 => Shade::DarkGray,
            _ => Shade::Black,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Shade::White => 0,
            Shade::LightGray => 1,
            Shade::DarkGray => 2,
            Shade::Black => 3,
        }
    }
}
