use crate::memory::mmu::Mmu;
use crate::memory::registers::InterruptFlags;
use crate::memory::{DIV_REGISTER, TAC_REGISTER, TIMA_REGISTER, TMA_REGISTER};
use log::trace;

const DIV_PERIOD: usize = 256;
const TIMA_PERIODS: [usize; 4] = [1024, 16, 64, 256];

#[derive(Clone)]
pub struct Timer {
    div_cycles: usize,
    tima_cycles: usize,
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            div_cycles: 0,
            tima_cycles: 0,
        }
    }

    pub fn tick(&mut self, mmu: &mut Mmu, cycles: usize) {
        self.div_cycles += cycles;
        while self.div_cycles >= DIV_PERIOD {
            self.div_cycles -= DIV_PERIOD;
            let div = mmu.read(DIV_REGISTER);
            mmu.write_unchecked(DIV_REGISTER, div.wrapping_add(1));
        }

        let tac = mmu.read(TAC_REGISTER);
        if tac & 0b100 == 0 {
            return;
        }

        let period = TIMA_PERIODS[(tac & 0b11) as usize];
        self.tima_cycles += cycles;
        while self.tima_cycles >= period {
            self.tima_cycles -= period;

            let tima = mmu.read(TIMA_REGISTER);
            if tima == 0xff {
                let tma = mmu.read(TMA_REGISTER);
                trace!("TIMA overflow, reloading ${:02x}", tma);
                mmu.write_unchecked(TIMA_REGISTER, tma);
                mmu.request_interrupt(InterruptFlags::TIMER);
            } else {
                mmu.write_unchecked(TIMA_REGISTER, tima + 1);
            }
        }
    }
}

impl Default for Timer {
    fn default() -> Timer {
        Timer::new()
    }
}
