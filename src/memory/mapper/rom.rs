use crate::memory::mapper::Mapper;
use crate::memory::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, OPEN_BUS, ROM_BANK_N_END};
use log::trace;

#[derive(Clone)]
pub struct Rom {
    memory: Vec<u8>,
    ram: Option<Vec<u8>>,
    writable: bool,
}

impl Rom {
    pub fn new(memory: Vec<u8>) -> Rom {
        Rom {
            memory,
            ram: None,
            writable: false,
        }
    }

    /// ROM+RAM cartridges carry a single unbanked 8 KiB RAM chip.
    pub fn with_ram(memory: Vec<u8>) -> Rom {
        Rom {
            memory,
            ram: Some(vec![0; 0x2000]),
            writable: false,
        }
    }

    /// Flat 32 KiB image that accepts writes, so tests can place programs anywhere in ROM space.
    #[cfg(test)]
    pub fn writable(memory: Vec<u8>) -> Rom {
        let mut memory = memory;
        memory.resize(0x8000, 0);

        Rom {
            memory,
            ram: Some(vec![0; 0x2000]),
            writable: true,
        }
    }
}

impl Mapper for Rom {
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=ROM_BANK_N_END => self.memory.get(addr as usize).copied().unwrap_or(OPEN_BUS),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => match &self.ram {
                Some(ram) => ram[(addr - EXTERNAL_RAM_START) as usize],
                None => OPEN_BUS,
            },
            _ => OPEN_BUS,
        }
    }

    #[inline]
    fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=ROM_BANK_N_END if self.writable => self.memory[addr as usize] = data,
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END if self.ram.is_some() => {
                if let Some(ram) = self.ram.as_mut() {
                    ram[(addr - EXTERNAL_RAM_START) as usize] = data;
                }
            }
            // We simply only have a ROM. Writes are dropped like on hardware.
            _ => trace!("ROM: dropped write of {:02x} to ${:04x}", data, addr),
        }
    }

    #[inline]
    fn current_rom_bank(&self) -> u8 {
        1
    }

    #[inline]
    fn current_ram_bank(&self) -> u8 {
        0
    }

    #[inline]
    fn name(&self) -> String {
        match self.ram {
            Some(_) => String::from("ROM+RAM"),
            None => String::from("ROM"),
        }
    }
}
