use futures::{SinkExt, StreamExt};
use std::{path::Path, pin::Pin, time::Duration};
use tokio_util::codec::Decoder;

use super::proto::{codec::ProtocolCodec, command::Command, ProtoError};
use crate::frame::Frame;
use crate::hidraw::HidRaw;
use crate::proto::Result;
use crate::reading::Reading;
use crate::READ_TIMEOUT;

trait AsyncReadWrite<S>: futures::Sink<S> + futures::Stream {}

impl<T, S> AsyncReadWrite<S> for T where T: futures::Sink<S> + futures::Stream {}

#[allow(clippy::type_complexity)]
pub struct Device {
    stream: Pin<
        Box<
            dyn AsyncReadWrite<
                Command,
                Error = std::io::Error,
                Item = std::result::Result<Frame, std::io::Error>,
            >,
        >,
    >,
    timeout: Duration,
}

impl Device {
    /// Open the hidraw node of the interface cable, e.g. `/dev/hidraw0`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let hid = HidRaw::open(path.as_ref())?;
        log::debug!("Opened {}", path.as_ref().display());
        Ok(Self::from_hidraw(hid))
    }

    /// Use an already opened hidraw node.
    pub fn from_hidraw(hid: HidRaw) -> Self {
        let stream = ProtocolCodec::default().framed(hid);

        Self {
            stream: Box::pin(stream),
            timeout: READ_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub(crate) fn new_faked(response_buf: Vec<u8>) -> Self {
        let fake = super::proto::fake::FakeBuffer::new(response_buf, crate::frame::CHUNK_LEN);
        let stream = ProtocolCodec::default().framed(fake);

        Self {
            stream: Box::pin(stream),
            timeout: READ_TIMEOUT,
        }
    }

    /// Maximum time to wait for a complete frame
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query the raw LCD segment state.
    ///
    /// The timeout covers sending the trigger and receiving the frame.
    /// After a timeout the device can be queried again.
    pub async fn frame(&mut self) -> Result<Frame> {
        let timeout = self.timeout;
        let cycle = async {
            self.stream.send(Command::Trigger).await?;
            match self.stream.next().await {
                Some(Ok(frame)) => Ok(frame),
                Some(Err(ioerr)) => Err(ioerr.into()),
                None => Err(ProtoError::Abort),
            }
        };
        match tokio::time::timeout(timeout, cycle).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ProtoError::Timeout(timeout)),
        }
    }

    /// Get current (live) reading of both displays
    pub async fn reading(&mut self) -> Result<Reading> {
        let frame = self.frame().await?;
        Ok(Reading::decode(&frame))
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::fs::File;
    use std::io::{Read, Write};
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;

    /// Device on one end of a socket pair, the returned end plays the meter.
    fn connected(timeout: Duration) -> (Device, UnixStream) {
        let (ours, meter) = UnixStream::pair().unwrap();
        let hid = HidRaw::new(File::from(OwnedFd::from(ours))).unwrap();
        (Device::from_hidraw(hid).with_timeout(timeout), meter)
    }

    fn dc_volt_frame() -> Vec<u8> {
        let mut buf = vec![0u8; 24];
        buf[1] = 0b0001_0000; // DC
        buf[3] = 0b1010_0000; // 1
        buf[4] = 0b1101_1011; // .2
        buf[8] = 0b0000_0001; // V
        buf
    }

    #[tokio::test]
    async fn test_get_reading() {
        let mut device = Device::new_faked(dc_volt_frame());
        let reading = device.reading().await.unwrap();
        assert_eq!(reading.main_value, "1.2    ");
        assert_eq!(reading.main_unit, "DC V");
    }

    #[tokio::test]
    async fn test_consecutive_readings() {
        let mut buf = dc_volt_frame();
        buf.extend(dc_volt_frame());
        let mut device = Device::new_faked(buf);
        let first = device.reading().await.unwrap();
        let second = device.reading().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stream_ends() {
        let mut device = Device::new_faked(vec![]);
        assert!(matches!(device.frame().await, Err(ProtoError::Abort)));
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let mut device = Device::new_faked(vec![0u8; 12]);
        assert!(matches!(device.frame().await, Err(ProtoError::Io(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_recoverable() {
        let (mut device, _meter) = connected(Duration::from_millis(100));
        for _ in 0..2 {
            let result = tokio::time::timeout(Duration::from_secs(2), device.frame())
                .await
                .expect("frame() must return on its own timeout");
            assert!(matches!(result, Err(ProtoError::Timeout(_))));
        }
    }

    #[tokio::test]
    async fn test_reading_after_timeout() {
        let (mut device, mut meter) = connected(Duration::from_millis(100));
        assert!(matches!(device.frame().await, Err(ProtoError::Timeout(_))));

        let mut trigger = [0u8; 4];
        meter.read_exact(&mut trigger).unwrap();
        assert_eq!(trigger, crate::proto::command::TRIGGER);

        let answer = dc_volt_frame();
        let meter = std::thread::spawn(move || {
            let mut trigger = [0u8; 4];
            meter.read_exact(&mut trigger).unwrap();
            for chunk in answer.chunks(8) {
                meter.write_all(chunk).unwrap();
            }
            trigger
        });

        let reading = tokio::time::timeout(Duration::from_secs(2), device.reading())
            .await
            .expect("reading() must return")
            .unwrap();
        assert_eq!(reading.main_unit, "DC V");
        assert_eq!(meter.join().unwrap(), crate::proto::command::TRIGGER);
    }
}
