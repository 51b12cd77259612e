use crate::joypad::{Button, Joypad};
use crate::memory::mapper::Mapper;
use crate::memory::registers::InterruptFlags;
use crate::memory::*;
use crate::video::{LCD_STATUS_REGISTER, SCANLINE_Y_REGISTER};
use log::trace;

const STAT_READ_ONLY_MASK: u8 = 0b0000_0111;

#[derive(Clone)]
pub struct Mmu {
    cartridge: Box<dyn Mapper>,
    vram: Vec<u8>,
    wram0: Vec<u8>,
    wram1: Vec<u8>,
    oam: Vec<u8>,
    io: Vec<u8>,
    hram: Vec<u8>,
    interrupt_enable: u8,
    joypad: Joypad,
}

impl Mmu {
    pub fn new(cartridge: Box<dyn Mapper>) -> Mmu {
        Mmu {
            cartridge,
            vram: vec![0; (VRAM_END - VRAM_START + 1) as usize],
            wram0: vec![0; (WRAM_0_END - WRAM_0_START + 1) as usize],
            wram1: vec![0; (WRAM_1_END - WRAM_1_START + 1) as usize],
            oam: vec![0; OAM_SIZE],
            io: vec![0; (IO_END - IO_START + 1) as usize],
            hram: vec![0; (HRAM_END - HRAM_START + 1) as usize],
            interrupt_enable: 0,
            joypad: Joypad::new(),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => self.cartridge.read(addr),
            VRAM_START..=VRAM_END => self.vram[(addr - VRAM_START) as usize],
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read(addr),
            WRAM_0_START..=WRAM_0_END => self.wram0[(addr - WRAM_0_START) as usize],
            WRAM_1_START..=WRAM_1_END => self.wram1[(addr - WRAM_1_START) as usize],
            ECHO_0_START..=ECHO_0_END => self.wram0[(addr - ECHO_0_START) as usize],
            ECHO_1_START..=ECHO_1_END => self.wram1[(addr - ECHO_1_START) as usize],
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize],
            RESERVED_START..=RESERVED_END => OPEN_BUS,
            JOYPAD_REGISTER => self.joypad.read(),
            IO_START..=IO_END => self.io[(addr - IO_START) as usize],
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize],
            INTERRUPT_ENABLE_REGISTER => self.interrupt_enable,
        }
    }

    pub fn read_as<T>(&self, addr: u16) -> T
    where
        T: From<u8>,
    {
        T::from(self.read(addr))
    }

    /// CPU-facing write, applies the I/O register side effects.
    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            JOYPAD_REGISTER => self.joypad.write(data),
            DIV_REGISTER => self.write_unchecked(DIV_REGISTER, 0),
            LCD_STATUS_REGISTER => {
                let status = self.read(LCD_STATUS_REGISTER);
                let data = (data & !STAT_READ_ONLY_MASK) | (status & STAT_READ_ONLY_MASK);
                self.write_unchecked(LCD_STATUS_REGISTER, data);
            }
            SCANLINE_Y_REGISTER => trace!("Dropped write of {:02x} to LY", data),
            OAM_DMA_REGISTER => {
                self.write_unchecked(OAM_DMA_REGISTER, data);
                self.dma_transfer(data);
            }
            _ => self.write_unchecked(addr, data),
        }
    }

    /// Raw store without register side effects. Used by the timer and the PPU
    /// to drive DIV, LY and STAT.
    pub fn write_unchecked(&mut self, addr: u16, data: u8) {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => self.cartridge.write(addr, data),
            VRAM_START..=VRAM_END => self.vram[(addr - VRAM_START) as usize] = data,
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.write(addr, data),
            WRAM_0_START..=WRAM_0_END => self.wram0[(addr - WRAM_0_START) as usize] = data,
            WRAM_1_START..=WRAM_1_END => self.wram1[(addr - WRAM_1_START) as usize] = data,
            ECHO_0_START..=ECHO_0_END => self.wram0[(addr - ECHO_0_START) as usize] = data,
            ECHO_1_START..=ECHO_1_END => self.wram1[(addr - ECHO_1_START) as usize] = data,
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize] = data,
            RESERVED_START..=RESERVED_END => trace!("Dropped write of {:02x} to reserved ${:04x}", data, addr),
            IO_START..=IO_END => self.io[(addr - IO_START) as usize] = data,
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize] = data,
            INTERRUPT_ENABLE_REGISTER => self.interrupt_enable = data,
        }
    }

    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write16(&mut self, addr: u16, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    fn dma_transfer(&mut self, page: u8) {
        let source = (page as u16) << 8;
        trace!("OAM DMA from ${:04x}", source);
        for offset in 0..OAM_SIZE as u16 {
            self.oam[offset as usize] = self.read(source.wrapping_add(offset));
        }
    }

    pub fn request_interrupt(&mut self, interrupt: InterruptFlags) {
        let flags = self.read(INTERRUPT_FLAGS_REGISTER) | interrupt.bits();
        self.write_unchecked(INTERRUPT_FLAGS_REGISTER, flags);
    }

    pub fn clear_interrupt(&mut self, interrupt: InterruptFlags) {
        let flags = self.read(INTERRUPT_FLAGS_REGISTER) & !interrupt.bits();
        self.write_unchecked(INTERRUPT_FLAGS_REGISTER, flags);
    }

    pub fn interrupt_flags(&self) -> InterruptFlags {
        self.read_as(INTERRUPT_FLAGS_REGISTER)
    }

    pub fn interrupt_enable(&self) -> InterruptFlags {
        self.read_as(INTERRUPT_ENABLE_REGISTER)
    }

    /// Interrupts both requested and enabled, regardless of IME.
    pub fn pending_interrupts(&self) -> InterruptFlags {
        self.interrupt_flags() & self.interrupt_enable()
    }

    pub fn set_button_state(&mut self, button: Button, pressed: bool) {
        self.joypad.update_button(button, pressed);
    }

    pub fn joypad(&self) -> &Joypad {
        &self.joypad
    }

    pub fn current_rom_bank(&self) -> u8 {
        self.cartridge.current_rom_bank()
    }

    pub fn cartridge_name(&self) -> String {
        self.cartridge.name()
    }
}
