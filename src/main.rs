use clap::{Parser, ValueEnum};
use dmgboy::error::{DmgError, LoggerInitSnafu, RomReadSnafu};
use dmgboy::gameboy::GameBoy;
use dmgboy::joypad::Button;
use dmgboy::lr35902::T_CYCLES_PER_SECOND;
use dmgboy::video::palette::Shade;
use log::{info, LevelFilter};
use snafu::ResultExt;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dmgboy", about = "Headless DMG Game Boy runner", long_about = None)]
struct Args {
    /// Path to the cartridge image
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value_t = 60)]
    frames: usize,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// Buttons held down for the whole run
    #[arg(long, value_enum)]
    hold: Vec<HeldButton>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum HeldButton {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl From<HeldButton> for Button {
    fn from(button: HeldButton) -> Button {
        match button {
            HeldButton::Right => Button::Right,
            HeldButton::Left => Button::Left,
            HeldButton::Up => Button::Up,
            HeldButton::Down => Button::Down,
            HeldButton::A => Button::A,
            HeldButton::B => Button::B,
            HeldButton::Select => Button::Select,
            HeldButton::Start => Button::Start,
        }
    }
}

fn setup_logger(level: LevelFilter) -> Result<(), DmgError> {
    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] [{}] {}", record.level(), record.target(), message)))
        .level(level)
        .chain(std::io::stdout())
        .apply()
        .context(LoggerInitSnafu)
}

#[snafu::report]
fn main() -> Result<(), DmgError> {
    let args = Args::parse();
    setup_logger(args.log_level)?;

    let rom = std::fs::read(&args.rom).context(RomReadSnafu { path: args.rom.clone() })?;
    let mut gb = GameBoy::new(rom)?;
    for button in &args.hold {
        gb.set_button_state((*button).into(), true);
    }

    let mut cycles = 0;
    for _ in 0..args.frames {
        cycles += gb.run_frame()?;
    }

    let mut histogram = [0usize; 4];
    for shade in gb.frame().iter().flatten() {
        histogram[shade.as_u8() as usize] += 1;
    }

    info!(
        "Ran {} frames, {} cycles ({:.2}s of emulated time)",
        args.frames,
        cycles,
        cycles as f64 / T_CYCLES_PER_SECOND as f64
    );
    info!("{}", gb.cpu());
    info!(
        "Shades: {:?}={} {:?}={} {:?}={} {:?}={}",
        Shade::White,
        histogram[0],
        Shade::LightGray,
        histogram[1],
        Shade::DarkGray,
        histogram[2],
        Shade::Black,
        histogram[3]
    );

    Ok(())
}
