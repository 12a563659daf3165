use crate::frame::{Frame, FrameAssembler, CHUNK_LEN};
use crate::proto::command::Command;
use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

#[derive(Default)]
pub struct ProtocolCodec {
    last_cmd: Option<Command>,
    assembler: FrameAssembler,
    // Bytes left in the read buffer after the last decode call
    unread: usize,
    // Bytes of an interrupted cycle still to be dropped
    stale: usize,
}

impl ProtocolCodec {
    fn decode_chunks(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, io::Error> {
        while src.len() >= CHUNK_LEN {
            if self.last_cmd.is_none() {
                return Err(invalid_data("Received data without a trigger"));
            }
            let chunk = src.split_to(CHUNK_LEN);
            self.assembler
                .store(self.assembler.received() as u8, &chunk)
                .map_err(invalid_data)?;

            if self.assembler.is_complete() {
                let frame = self.assembler.finish().map_err(invalid_data)?;
                self.last_cmd = None;
                return Ok(Some(frame));
            }
        }
        Ok(None) // Not enough bytes yet
    }
}

fn invalid_data<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}

impl Decoder for ProtocolCodec {
    type Item = Frame;
    // Like the transport, the codec only reports io::Error. Frame
    // assembly failures show up as InvalidData.
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let stale = self.stale.min(src.len());
        if stale > 0 {
            log::debug!("Dropping {} bytes of an interrupted frame", stale);
            src.advance(stale);
            self.stale -= stale;
        }
        let result = self.decode_chunks(src);
        self.unread = src.len();
        result
    }
}

impl Encoder<Command> for ProtocolCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        // A new trigger restarts the frame, leftovers of an
        // interrupted cycle are dropped.
        self.assembler = FrameAssembler::new();
        self.stale = self.unread;
        self.last_cmd = Some(item);
        Ok(())
    }
}
