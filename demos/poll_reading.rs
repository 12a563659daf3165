use bm869ctrl::{proto::ProtoError, Device, DEFAULT_DEVICE};

#[tokio::main]
async fn main() -> bm869ctrl::Result<()> {
    let mut device = Device::new(DEFAULT_DEVICE)?;

    loop {
        match device.reading().await {
            Ok(reading) => {
                println!("Main: {} {}", reading.main_value, reading.main_unit);
            }
            Err(ProtoError::Timeout(_)) => {
                println!("NO_DATA");
            }
            Err(err) => return Err(err),
        }
    }
}
