//!
//! This library reads a Brymen BM869S digital multimeter through the
//! Brymen USB interface cable.
//!
//! <br>
//!
//! # Details
//!
//! - The meter does not send measured values. It mirrors which LCD segments
//!   are lit, this crate turns them back into numbers, units and modes.
//!
//! - The cable is a HID device (VID `0x0820`, PID `0x0001`), opened through
//!   its Linux `hidraw` node.
//!
//! - Basic setup and connection
//!
//!   ```no_run
//!   use bm869ctrl::{Device, DEFAULT_DEVICE};
//!   #[tokio::main]
//!   async fn main() -> bm869ctrl::Result<()> {
//!       let mut device = Device::new(DEFAULT_DEVICE)?;
//!       let reading = device.reading().await?;
//!       println!("{} {}", reading.main_value, reading.main_unit);
//!       Ok(())
//!   }
//!   ```
//!
//! # Supported devices
//!
//!  * Brymen BM869S
//!

use std::time::Duration;

pub mod device;
pub mod frame;
pub mod hidraw;
pub mod proto;
pub mod reading;
pub mod segment;

pub use device::Device;
pub use proto::Result;
pub use reading::Reading;

pub const DEFAULT_DEVICE: &str = "/dev/hidraw0";

/// USB IDs of the Brymen BU-86X interface cable.
pub const USB_VID: u16 = 0x0820;
pub const USB_PID: u16 = 0x0001;

/// Time to wait for a frame after the trigger was sent.
pub const READ_TIMEOUT: Duration = Duration::from_secs(4);
