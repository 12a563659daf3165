/// Request sent to the interface cable before each frame.
///
/// The first byte is the HID report number, `0` for unnumbered reports.
pub const TRIGGER: [u8; 4] = [0x00, 0x00, 0x86, 0x66];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Ask for one LCD snapshot (three chunks)
    Trigger,
}

impl Command {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Command::Trigger => &TRIGGER,
        }
    }
}
