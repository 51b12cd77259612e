use crate::memory::mmu::Mmu;
use crate::memory::registers::{InterruptFlags, LcdControl, LcdStatus};
use crate::video::palette::Shade;
use crate::video::sprite::{Sprite, SpriteAttributes};
use crate::video::state::State;
use crate::video::tile::{tile_data_address, TileRow};
use crate::video::*;
use log::{debug, trace};

const VBLANK_START: u8 = SCREEN_HEIGHT as u8;
const LAST_SCANLINE: u8 = (SCANLINES_PER_FRAME - 1) as u8;

pub type Frame = [[Shade; SCREEN_WIDTH]; SCREEN_HEIGHT];

#[derive(Clone)]
pub struct Ppu {
    state: State,
    cycles: usize,
    frame: Box<Frame>,
    frame_ready: bool,
    lcd_enabled: bool,
}

impl Ppu {
    /// Starts at OAM search of line 0.
    pub fn new() -> Ppu {
        Ppu {
            state: State::OamScan,
            cycles: 0,
            frame: Box::new([[Shade::White; SCREEN_WIDTH]; SCREEN_HEIGHT]),
            frame_ready: false,
            lcd_enabled: true,
        }
    }

    pub fn tick(&mut self, mmu: &mut Mmu, cycles: usize) {
        let lcdc = mmu.read_as::<LcdControl>(LCD_CONTROL_REGISTER);
        if !lcdc.contains(LcdControl::LCD_DISPLAY) {
            self.tick_disabled(mmu, cycles);
            return;
        }

        if !self.lcd_enabled {
            debug!("LCD enabled");
            self.lcd_enabled = true;
            self.cycles = 0;
            self.set_scanline(mmu, 0);
            self.enter(mmu, State::OamScan);
        }

        self.cycles += cycles;
        while self.cycles >= self.state.duration() {
            self.cycles -= self.state.duration();

            match self.state {
                State::OamScan => self.enter(mmu, State::Drawing),
                State::Drawing => {
                    self.render_scanline(mmu);
                    self.enter(mmu, State::HBlank);
                }
                State::HBlank => {
                    let ly = mmu.read(SCANLINE_Y_REGISTER).wrapping_add(1);
                    self.set_scanline(mmu, ly);

                    if ly == VBLANK_START {
                        mmu.request_interrupt(InterruptFlags::VBLANK);
                        self.frame_ready = true;
                        self.enter(mmu, State::VBlank);
                    } else {
                        self.enter(mmu, State::OamScan);
                    }
                }
                State::VBlank => {
                    let ly = mmu.read(SCANLINE_Y_REGISTER);
                    if ly >= LAST_SCANLINE {
                        self.set_scanline(mmu, 0);
                        self.enter(mmu, State::OamScan);
                    } else {
                        self.set_scanline(mmu, ly + 1);
                    }
                }
            }
        }
    }

    /// With the LCD off LY stays 0 in mode 0. A blank frame is still
    /// reported every 70224 cycles so the driving loop keeps its pace.
    fn tick_disabled(&mut self, mmu: &mut Mmu, cycles: usize) {
        if self.lcd_enabled {
            debug!("LCD disabled");
            self.lcd_enabled = false;
            self.cycles = 0;
            self.state = State::HBlank;
            mmu.write_unchecked(SCANLINE_Y_REGISTER, 0);
            let status = mmu.read(LCD_STATUS_REGISTER) & !LcdStatus::MODE.bits();
            mmu.write_unchecked(LCD_STATUS_REGISTER, status);
            for line in self.frame.iter_mut() {
                line.fill(Shade::White);
            }
        }

        self.cycles += cycles;
        if self.cycles >= CYCLES_PER_FRAME {
            self.cycles -= CYCLES_PER_FRAME;
            self.frame_ready = true;
        }
    }

    /// Replaces the STAT mode bits and raises the STAT interrupt when the new mode's source is enabled.
    fn enter(&mut self, mmu: &mut Mmu, state: State) {
        self.state = state;

        let status = mmu.read_as::<LcdStatus>(LCD_STATUS_REGISTER);
        let mode = (status.bits() & !LcdStatus::MODE.bits()) | state.as_u8();
        mmu.write_unchecked(LCD_STATUS_REGISTER, mode);

        if let Some(source) = state.interrupt_source() {
            if status.contains(source) {
                mmu.request_interrupt(InterruptFlags::LCD_STAT);
            }
        }
    }

    /// Writes LY and refreshes the LY=LYC coincidence bit.
    fn set_scanline(&mut self, mmu: &mut Mmu, ly: u8) {
        mmu.write_unchecked(SCANLINE_Y_REGISTER, ly);

        let mut status = mmu.read_as::<LcdStatus>(LCD_STATUS_REGISTER);
        let coincidence = ly == mmu.read(SCANLINE_Y_COMPARE_REGISTER);
        status.set(LcdStatus::COINCIDENCE, coincidence);
        mmu.write_unchecked(LCD_STATUS_REGISTER, status.bits());

        if coincidence && status.contains(LcdStatus::COINCIDENCE_INTERRUPT) {
            trace!("LY=LYC coincidence on line {}", ly);
            mmu.request_interrupt(InterruptFlags::LCD_STAT);
        }
    }

    fn render_scanline(&mut self, mmu: &Mmu) {
        let ly = mmu.read(SCANLINE_Y_REGISTER) as usize;
        if ly >= SCREEN_HEIGHT {
            return;
        }

        let lcdc = mmu.read_as::<LcdControl>(LCD_CONTROL_REGISTER);
        let mut line = [Shade::White; SCREEN_WIDTH];

        if lcdc.contains(LcdControl::BG_DISPLAY) {
            self.render_background(mmu, lcdc, ly, &mut line);
        }

        if lcdc.contains(LcdControl::OBJ_DISPLAY) {
            self.render_sprites(mmu, lcdc, ly, &mut line);
        }

        self.frame[ly] = line;
    }

    /// Draws either the window or the background for the line. Pixels left of
    /// the window's X origin come from the background.
    fn render_background(&self, mmu: &Mmu, lcdc: LcdControl, ly: usize, line: &mut [Shade; SCREEN_WIDTH]) {
        let bgp = mmu.read(BG_PALETTE_REGISTER);
        let scx = mmu.read(SCROLL_X_REGISTER);
        let scy = mmu.read(SCROLL_Y_REGISTER);
        let wy = mmu.read(WINDOW_Y_REGISTER);
        let window_x = mmu.read(WINDOW_X_REGISTER) as isize - 7;
        let unsigned_addressing = lcdc.contains(LcdControl::BG_TILE_DATA);

        let window = lcdc.contains(LcdControl::WINDOW_DISPLAY) && wy as usize <= ly;

        let bg_map = if lcdc.contains(LcdControl::BG_TILE_MAP) {
            TILEMAP_1_ADDRESS
        } else {
            TILEMAP_0_ADDRESS
        };
        let window_map = if lcdc.contains(LcdControl::WINDOW_TILE_MAP) {
            TILEMAP_1_ADDRESS
        } else {
            TILEMAP_0_ADDRESS
        };

        let mut row = TileRow::default();
        let mut current_tile = None;

        for (p, pixel) in line.iter_mut().enumerate() {
            let (map, x, y) = if window && p as isize >= window_x {
                (window_map, (p as isize - window_x) as u8, (ly - wy as usize) as u8)
            } else {
                (bg_map, (p as u8).wrapping_add(scx), (ly as u8).wrapping_add(scy))
            };

            // Only re-fetch at tile boundaries.
            let tile_address = map + (y as u16 / 8) * 32 + (x as u16 / 8);
            if current_tile != Some((tile_address, y)) {
                let tile_id = mmu.read(tile_address);
                row = TileRow::fetch(mmu, tile_data_address(tile_id, unsigned_addressing), y & 7);
                current_tile = Some((tile_address, y));
            }

            *pixel = Shade::from_palette(bgp, row.color(x & 7));
        }
    }

    /// OAM is walked from entry 39 down to 0 so lower indices end up on top.
    fn render_sprites(&self, mmu: &Mmu, lcdc: LcdControl, ly: usize, line: &mut [Shade; SCREEN_WIDTH]) {
        let height = if lcdc.contains(LcdControl::OBJ_SIZE) { 16 } else { 8 };
        let transparent_bg = Shade::from_palette(mmu.read(BG_PALETTE_REGISTER), 0);
        let obp0 = mmu.read(OBJ0_PALETTE_REGISTER);
        let obp1 = mmu.read(OBJ1_PALETTE_REGISTER);

        for index in (0..OAM_ENTRIES).rev() {
            let sprite = Sprite::from_oam(mmu, index);
            let Some(tile_line) = sprite.line_on_scanline(ly, height) else {
                continue;
            };

            let tile_address = TILESET_0_ADDRESS + sprite.tile_index(height) as u16 * 16;
            let row = TileRow::fetch(mmu, tile_address, tile_line as u8);
            let palette = if sprite.attributes.contains(SpriteAttributes::PALETTE) {
                obp1
            } else {
                obp0
            };
            let behind_bg = sprite.attributes.contains(SpriteAttributes::PRIORITY);

            for p in 0..8u8 {
                let x = sprite.x as isize - 8 + p as isize;
                if x < 0 || x >= SCREEN_WIDTH as isize {
                    continue;
                }

                let column = if sprite.attributes.contains(SpriteAttributes::FLIP_X) {
                    7 - p
                } else {
                    p
                };
                let color = row.color(column);
                let target = &mut line[x as usize];

                if color != 0 && (!behind_bg || *target == transparent_bg) {
                    *target = Shade::from_palette(palette, color);
                }
            }
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// True once per completed frame; reading it clears the flag.
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    pub fn state(&self) -> State {
        self.state
    }
}

impl Default for Ppu {
    fn default() -> Ppu {
        Ppu::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mapper::rom::Rom;
    use crate::memory::INTERRUPT_FLAGS_REGISTER;

    fn setup() -> (Ppu, Mmu) {
        let mut mmu = Mmu::new(Box::new(Rom::writable(vec![])));
        mmu.write(LCD_CONTROL_REGISTER, 0x91);
        mmu.write(BG_PALETTE_REGISTER, 0xe4);
        mmu.write(OBJ0_PALETTE_REGISTER, 0xe4);
        mmu.write(OBJ1_PALETTE_REGISTER, 0x1b);
        (Ppu::new(), mmu)
    }

    fn mode(mmu: &Mmu) -> u8 {
        mmu.read(LCD_STATUS_REGISTER) & 0b11
    }

    /// Writes an 8x8 tile whose every row is `lo`/`hi`.
    fn fill_tile(mmu: &mut Mmu, address: u16, lo: u8, hi: u8) {
        for line in 0..8 {
            mmu.write(address + line * 2, lo);
            mmu.write(address + line * 2 + 1, hi);
        }
    }

    #[test]
    fn scanline_phases() {
        let (mut ppu, mut mmu) = setup();
        ppu.tick(&mut mmu, 79);
        assert_eq!(ppu.state(), State::OamScan);
        ppu.tick(&mut mmu, 1);
        assert_eq!(ppu.state(), State::Drawing);
        assert_eq!(mode(&mmu), 3);
        ppu.tick(&mut mmu, 172);
        assert_eq!(ppu.state(), State::HBlank);
        assert_eq!(mode(&mmu), 0);
        ppu.tick(&mut mmu, 204);
        assert_eq!(ppu.state(), State::OamScan);
        assert_eq!(mmu.read(SCANLINE_Y_REGISTER), 1);
    }

    #[test]
    fn full_frame_raises_vblank_once() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0);

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE * SCREEN_HEIGHT - 1);
        assert!(!ppu.take_frame_ready());
        ppu.tick(&mut mmu, 1);
        assert_eq!(ppu.state(), State::VBlank);
        assert_eq!(mmu.read(SCANLINE_Y_REGISTER), 144);
        assert!(mmu.interrupt_flags().contains(InterruptFlags::VBLANK));
        assert!(ppu.take_frame_ready());
        assert!(!ppu.take_frame_ready());

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE * 10);
        assert_eq!(ppu.state(), State::OamScan);
        assert_eq!(mmu.read(SCANLINE_Y_REGISTER), 0);
    }

    #[test]
    fn frame_period_is_constant() {
        let (mut ppu, mut mmu) = setup();
        ppu.tick(&mut mmu, CYCLES_PER_FRAME);
        assert!(ppu.take_frame_ready());
        assert_eq!(ppu.state(), State::OamScan);
        assert_eq!(mmu.read(SCANLINE_Y_REGISTER), 0);

        ppu.tick(&mut mmu, CYCLES_PER_FRAME);
        assert!(ppu.take_frame_ready());
    }

    #[test]
    fn stat_mode_interrupts() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0);
        mmu.write(LCD_STATUS_REGISTER, LcdStatus::HBLANK_INTERRUPT.bits());

        ppu.tick(&mut mmu, 80);
        assert!(!mmu.interrupt_flags().contains(InterruptFlags::LCD_STAT));
        ppu.tick(&mut mmu, 172);
        assert!(mmu.interrupt_flags().contains(InterruptFlags::LCD_STAT));
    }

    #[test]
    fn lyc_coincidence() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0);
        mmu.write(SCANLINE_Y_COMPARE_REGISTER, 2);
        mmu.write(LCD_STATUS_REGISTER, LcdStatus::COINCIDENCE_INTERRUPT.bits());

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE);
        assert!(!mmu.read_as::<LcdStatus>(LCD_STATUS_REGISTER).contains(LcdStatus::COINCIDENCE));
        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE);
        assert!(mmu.read_as::<LcdStatus>(LCD_STATUS_REGISTER).contains(LcdStatus::COINCIDENCE));
        assert!(mmu.interrupt_flags().contains(InterruptFlags::LCD_STAT));
    }

    #[test]
    fn lcd_off_resets_and_resumes() {
        let (mut ppu, mut mmu) = setup();
        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE * 5 + 100);
        assert_eq!(mmu.read(SCANLINE_Y_REGISTER), 5);

        mmu.write(LCD_CONTROL_REGISTER, 0x11);
        ppu.tick(&mut mmu, 4);
        assert_eq!(mmu.read(SCANLINE_Y_REGISTER), 0);
        assert_eq!(mode(&mmu), 0);

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE * 3);
        assert_eq!(mmu.read(SCANLINE_Y_REGISTER), 0);

        mmu.write(LCD_CONTROL_REGISTER, 0x91);
        ppu.tick(&mut mmu, 4);
        assert_eq!(ppu.state(), State::OamScan);
        assert_eq!(mode(&mmu), 2);
    }

    #[test]
    fn renders_background_tile() {
        let (mut ppu, mut mmu) = setup();
        // tile 1: every pixel color 3, placed at map column 1
        fill_tile(&mut mmu, 0x8010, 0xff, 0xff);
        mmu.write(TILEMAP_0_ADDRESS + 1, 0x01);

        ppu.tick(&mut mmu, 80 + 172);
        let line = ppu.frame()[0];
        assert!(line[..8].iter().all(|&shade| shade == Shade::White));
        assert!(line[8..16].iter().all(|&shade| shade == Shade::Black));
        assert_eq!(line[16], Shade::White);
    }

    #[test]
    fn scroll_x_shifts_background() {
        let (mut ppu, mut mmu) = setup();
        fill_tile(&mut mmu, 0x8010, 0xff, 0x00);
        mmu.write(TILEMAP_0_ADDRESS + 1, 0x01);
        mmu.write(SCROLL_X_REGISTER, 4);

        ppu.tick(&mut mmu, 80 + 172);
        let line = ppu.frame()[0];
        assert_eq!(line[3], Shade::White);
        assert_eq!(line[4], Shade::LightGray);
        assert_eq!(line[11], Shade::LightGray);
        assert_eq!(line[12], Shade::White);
    }

    #[test]
    fn signed_tile_data() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(LCD_CONTROL_REGISTER, 0x81);
        // id 0x80 resolves to $8800 in signed mode
        fill_tile(&mut mmu, 0x8800, 0x00, 0xff);
        mmu.write(TILEMAP_0_ADDRESS, 0x80);

        ppu.tick(&mut mmu, 80 + 172);
        assert_eq!(ppu.frame()[0][0], Shade::DarkGray);
    }

    #[test]
    fn window_replaces_background() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(LCD_CONTROL_REGISTER, 0x91 | LcdControl::WINDOW_DISPLAY.bits() | LcdControl::WINDOW_TILE_MAP.bits());
        fill_tile(&mut mmu, 0x8010, 0xff, 0xff);
        for column in 0..32 {
            mmu.write(TILEMAP_1_ADDRESS + column, 0x01);
        }
        mmu.write(WINDOW_Y_REGISTER, 0);
        mmu.write(WINDOW_X_REGISTER, 7 + 80);

        ppu.tick(&mut mmu, 80 + 172);
        let line = ppu.frame()[0];
        assert_eq!(line[79], Shade::White);
        assert_eq!(line[80], Shade::Black);
        assert_eq!(line[159], Shade::Black);
    }

    #[test]
    fn sprites_overlay_background() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(LCD_CONTROL_REGISTER, 0x93);
        // tile 2: left half color 1
        fill_tile(&mut mmu, 0x8020, 0xf0, 0x00);
        // sprite 0 at screen x 10, OBP1
        mmu.write(0xfe00, 16);
        mmu.write(0xfe01, 18);
        mmu.write(0xfe02, 0x02);
        mmu.write(0xfe03, SpriteAttributes::PALETTE.bits());

        ppu.tick(&mut mmu, 80 + 172);
        let line = ppu.frame()[0];
        assert_eq!(line[9], Shade::White);
        // OBP1 = 0x1b maps color 1 to shade 2
        assert_eq!(line[10], Shade::DarkGray);
        assert_eq!(line[13], Shade::DarkGray);
        assert_eq!(line[14], Shade::White);
    }

    #[test]
    fn sprite_behind_opaque_background() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(LCD_CONTROL_REGISTER, 0x93);
        fill_tile(&mut mmu, 0x8010, 0xff, 0xff);
        mmu.write(TILEMAP_0_ADDRESS, 0x01);
        fill_tile(&mut mmu, 0x8020, 0xff, 0x00);
        // covers x 4..12, behind the background
        mmu.write(0xfe00, 16);
        mmu.write(0xfe01, 12);
        mmu.write(0xfe02, 0x02);
        mmu.write(0xfe03, (SpriteAttributes::PRIORITY | SpriteAttributes::FLIP_X).bits());

        ppu.tick(&mut mmu, 80 + 172);
        let line = ppu.frame()[0];
        assert_eq!(line[4], Shade::Black);
        assert_eq!(line[7], Shade::Black);
        assert_eq!(line[8], Shade::LightGray);
        assert_eq!(line[11], Shade::LightGray);
    }

    #[test]
    fn lower_oam_index_wins() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(LCD_CONTROL_REGISTER, 0x83);
        fill_tile(&mut mmu, 0x8010, 0xff, 0x00);
        fill_tile(&mut mmu, 0x8020, 0xff, 0xff);
        for (index, tile) in [(0u16, 0x01u8), (1, 0x02)] {
            let entry = 0xfe00 + index * 4;
            mmu.write(entry, 16);
            mmu.write(entry + 1, 8);
            mmu.write(entry + 2, tile);
            mmu.write(entry + 3, 0);
        }

        ppu.tick(&mut mmu, 80 + 172);
        assert_eq!(ppu.frame()[0][0], Shade::LightGray);
    }

    #[test]
    fn vblank_entry_raises_stat() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0);
        mmu.write(LCD_STATUS_REGISTER, LcdStatus::VBLANK_INTERRUPT.bits());

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE * SCREEN_HEIGHT - 1);
        assert!(!mmu.interrupt_flags().contains(InterruptFlags::LCD_STAT));
        ppu.tick(&mut mmu, 1);
        assert_eq!(mode(&mmu), 1);
        assert!(mmu.interrupt_flags().contains(InterruptFlags::LCD_STAT | InterruptFlags::VBLANK));
    }

    #[test]
    fn oam_entry_raises_stat() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(INTERRUPT_FLAGS_REGISTER, 0);
        mmu.write(LCD_STATUS_REGISTER, LcdStatus::OAM_INTERRUPT.bits());

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE - 1);
        assert!(!mmu.interrupt_flags().contains(InterruptFlags::LCD_STAT));
        ppu.tick(&mut mmu, 1);
        assert_eq!(mode(&mmu), 2);
        assert!(mmu.interrupt_flags().contains(InterruptFlags::LCD_STAT));
    }

    #[test]
    fn tall_sprites_span_two_tiles() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(LCD_CONTROL_REGISTER, 0x93 | LcdControl::OBJ_SIZE.bits());
        // tiles 4 and 5: color 1 on top, color 3 below
        fill_tile(&mut mmu, 0x8040, 0xff, 0x00);
        fill_tile(&mut mmu, 0x8050, 0xff, 0xff);
        // odd index, the low bit is ignored
        mmu.write(0xfe00, 16);
        mmu.write(0xfe01, 8);
        mmu.write(0xfe02, 0x05);
        mmu.write(0xfe03, 0);

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE * 17);
        let frame = ppu.frame();
        assert_eq!(frame[0][0], Shade::LightGray);
        assert_eq!(frame[7][7], Shade::LightGray);
        assert_eq!(frame[8][0], Shade::Black);
        assert_eq!(frame[15][7], Shade::Black);
        assert_eq!(frame[16][0], Shade::White);
    }

    #[test]
    fn window_starts_at_window_y() {
        let (mut ppu, mut mmu) = setup();
        mmu.write(LCD_CONTROL_REGISTER, 0x91 | LcdControl::WINDOW_DISPLAY.bits() | LcdControl::WINDOW_TILE_MAP.bits());
        fill_tile(&mut mmu, 0x8010, 0xff, 0xff);
        for column in 0..32 {
            mmu.write(TILEMAP_1_ADDRESS + column, 0x01);
        }
        mmu.write(WINDOW_Y_REGISTER, 4);
        mmu.write(WINDOW_X_REGISTER, 7);

        ppu.tick(&mut mmu, CYCLES_PER_SCANLINE * 4 + 80 + 172);
        let frame = ppu.frame();
        assert!(frame[3].iter().all(|&shade| shade == Shade::White));
        assert!(frame[4].iter().all(|&shade| shade == Shade::Black));
    }
}
