use snafu::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DmgError {
    #[snafu(display(
        "Failed to decode instruction ({}{:02x}) at address: ${:04x}",
        if *prefixed { "cb " } else { "" },
        opcode,
        address
    ))]
    DecoderFailure { opcode: u8, address: u16, prefixed: bool },
    #[snafu(display("Header checksum mismatch: expected ${:02x}, computed ${:02x}", expected, actual))]
    HeaderChecksumMismatch { expected: u8, actual: u8 },
    #[snafu(display("ROM image too small to contain a header: {} bytes", size))]
    RomTooSmall { size: usize },
    #[snafu(display("Unsupported cartridge type: ${:02x}", mapper))]
    UnsupportedMapper { mapper: u8 },
    #[snafu(display("Failed to read ROM image from {}", path.display()))]
    RomRead { path: PathBuf, source: std::io::Error },
    #[snafu(display("Failed to install the logger"))]
    LoggerInit { source: log::SetLoggerError },
}
