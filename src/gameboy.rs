use crate::error::DmgError;
use crate::joypad::Button;
use crate::lr35902::cpu::Cpu;
use crate::lr35902::timer::Timer;
use crate::memory::cartridge;
use crate::memory::mapper::Mapper;
use crate::memory::mmu::Mmu;
use crate::memory::registers::InterruptFlags;
use crate::video::ppu::{Frame, Ppu};
use log::info;

/// I/O register values the boot ROM leaves behind.
const POWER_ON_IO: [(u16, u8); 34] = [
    (0xff05, 0x00), // TIMA
    (0xff06, 0x00), // TMA
    (0xff07, 0x00), // TAC
    (0xff10, 0x80), // NR10
    (0xff11, 0xbf), // NR11
    (0xff12, 0xf3), // NR12
    (0xff14, 0xbf), // NR14
    (0xff16, 0x3f), // NR21
    (0xff17, 0x00), // NR22
    (0xff19, 0xbf), // NR24
    (0xff1a, 0x7f), // NR30
    (0xff1b, 0xff), // NR31
    (0xff1c, 0x9f), // NR32
    (0xff1e, 0xbf), // NR33
    (0xff20, 0xff), // NR41
    (0xff21, 0x00), // NR42
    (0xff22, 0x00), // NR43
    (0xff23, 0xbf), // NR44
    (0xff24, 0x77), // NR50
    (0xff25, 0xf3), // NR51
    (0xff26, 0xf1), // NR52
    (0xff40, 0x91), // LCDC
    (0xff41, 0x85), // STAT
    (0xff42, 0x00), // SCY
    (0xff43, 0x00), // SCX
    (0xff44, 0x00), // LY
    (0xff45, 0x00), // LYC
    (0xff47, 0xfc), // BGP
    (0xff48, 0xff), // OBP0
    (0xff49, 0xff), // OBP1
    (0xff4a, 0x00), // WY
    (0xff4b, 0x00), // WX
    (0xff0f, 0xe1), // IF
    (0xffff, 0x00), // IE
];

#[derive(Clone)]
pub struct GameBoy {
    cpu: Cpu,
    mmu: Mmu,
    timer: Timer,
    ppu: Ppu,
}

impl GameBoy {
    pub fn new(rom: Vec<u8>) -> Result<GameBoy, DmgError> {
        let cartridge = cartridge::load(rom)?;
        Ok(GameBoy::with_mapper(cartridge))
    }

    /// Skips header validation, used to run bare programs.
    pub fn with_mapper(cartridge: Box<dyn Mapper>) -> GameBoy {
        let mut mmu = Mmu::new(cartridge);
        for (addr, value) in POWER_ON_IO {
            mmu.write_unchecked(addr, value);
        }

        info!("Cartridge mapper: {}", mmu.cartridge_name());

        GameBoy {
            cpu: Cpu::new(),
            mmu,
            timer: Timer::new(),
            ppu: Ppu::new(),
        }
    }

    /// Executes one CPU step and advances the rest of the machine by the same
    /// number of cycles.
    pub fn step(&mut self) -> Result<usize, DmgError> {
        let cycles = self.cpu.step(&mut self.mmu)?;
        self.timer.tick(&mut self.mmu, cycles);

        if self.mmu.joypad().interrupt_pending() {
            self.mmu.request_interrupt(InterruptFlags::JOYPAD);
        }

        self.ppu.tick(&mut self.mmu, cycles);
        Ok(cycles)
    }

    /// Steps until the PPU completes a frame. Returns the cycles spent.
    pub fn run_frame(&mut self) -> Result<usize, DmgError> {
        let mut cycles = 0;
        loop {
            cycles += self.step()?;
            if self.ppu.take_frame_ready() {
                return Ok(cycles);
            }
        }
    }

    pub fn set_button_state(&mut self, button: Button, pressed: bool) {
        self.mmu.set_button_state(button, pressed);
    }

    pub fn frame(&self) -> &Frame {
        self.ppu.frame()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }
}
