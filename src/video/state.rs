use crate::memory::registers::LcdStatus;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    HBlank,  // H-Blank
    VBlank,  // V-Blank
    OamScan, // OAM Scan
    Drawing, // Drawing
}

impl State {
    pub fn as_u8(self) -> u8 {
        match self {
            State::HBlank => 0,
            State::VBlank => 1,
            State::OamScan => 2,
            State::Drawing => 3,
        }
    }

    /// T-cycles spent in the state before the next transition. VBlank counts per line.
    pub fn duration(self) -> usize {
        match self {
            State::OamScan => 80,
            State::Drawing => 172,
            State::HBlank => 204,
            State::VBlank => 456,
        }
    }

    /// STAT bit that enables the interrupt on entering this state.
    pub fn interrupt_source(self) -> Option<LcdStatus> {
        match self {
            State::HBlank => Some(LcdStatus::HBLANK_INTERRUPT),
            State::VBlank => Some(LcdStatus::VBLANK_INTERRUPT),
            State::OamScan => Some(LcdStatus::OAM_INTERRUPT),
            State::Drawing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::{CYCLES_PER_FRAME, CYCLES_PER_SCANLINE};

    #[test]
    fn line_and_frame_lengths() {
        let line = State::OamScan.duration() + State::Drawing.duration() + State::HBlank.duration();
        assert_eq!(line, CYCLES_PER_SCANLINE);
        assert_eq!(State::VBlank.duration(), CYCLES_PER_SCANLINE);
        assert_eq!(CYCLES_PER_FRAME, 70224);
    }
}
