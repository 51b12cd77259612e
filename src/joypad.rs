use log::warn;

const DIRECTION_SELECT: u8 = 0b0001_0000;
const ACTION_SELECT: u8 = 0b0010_0000;
const SELECT_MASK: u8 = DIRECTION_SELECT | ACTION_SELECT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// Bit of the button inside its group's nibble.
    fn bit(&self) -> u8 {
        match self {
            Button::Right | Button::A => 0b0001,
            Button::Left | Button::B => 0b0010,
            Button::Up | Button::Select => 0b0100,
            Button::Down | Button::Start => 0b1000,
        }
    }

    fn is_direction(&self) -> bool {
        matches!(self, Button::Right | Button::Left | Button::Up | Button::Down)
    }
}

/// Both groups are stored active-high here; the register inverts them.
#[derive(Clone)]
pub struct Joypad {
    directions: u8,
    actions: u8,
    select: u8,
}

impl Joypad {
    pub fn new() -> Joypad {
        Joypad {
            directions: 0,
            actions: 0,
            select: SELECT_MASK,
        }
    }

    pub fn update_button(&mut self, button: Button, pressed: bool) {
        let group = if button.is_direction() {
            &mut self.directions
        } else {
            &mut self.actions
        };

        if pressed {
            *group |= button.bit();
        } else {
            *group &= !button.bit();
        }
    }

    /// Only the two group select bits are writable.
    pub fn write(&mut self, data: u8) {
        self.select = data & SELECT_MASK;
    }

    pub fn read(&self) -> u8 {
        let direction_select = self.select & DIRECTION_SELECT == 0;
        let button_select = self.select & ACTION_SELECT == 0;
        if button_select && direction_select {
            warn!("Joypad has buttons and d-pad mode selected");
        }

        let mut state = 0;
        if direction_select {
            state |= self.directions;
        }
        if button_select {
            state |= self.actions;
        }

        0b1100_0000 | self.select | (!state & 0x0f)
    }

    /// True when a selected group has at least one button held.
    pub fn interrupt_pending(&self) -> bool {
        (self.select & DIRECTION_SELECT == 0 && self.directions != 0)
            || (self.select & ACTION_SELECT == 0 && self.actions != 0)
    }
}

impl Default for Joypad {
    fn default() -> Joypad {
        Joypad::new()
    }
}
