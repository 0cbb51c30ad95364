//! Wire codec: fixed 128-byte command frames plus the numeric
//! conversions the controller uses for temperatures and audio levels.

pub mod units;

use bytes::{BufMut, BytesMut};

use crate::error::IRemoteError;

/// Every command and every poll message occupies exactly this many bytes.
pub const FRAME_SIZE: usize = 128;

/// Frames commands to (and poll messages from) the controller.
///
/// Outbound tokens are ASCII, NUL-padded (or truncated) to
/// [`FRAME_SIZE`]. Inbound frames are trimmed of trailing NUL and space
/// padding.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Render `token` into a single zero-padded frame.
    pub fn frame(token: &str) -> [u8; FRAME_SIZE] {
        let mut frame = [0u8; FRAME_SIZE];
        let bytes = token.as_bytes();
        let len = bytes.len().min(FRAME_SIZE);
        frame[..len].copy_from_slice(&bytes[..len]);
        frame
    }

    /// Decode one received frame into its token string.
    pub fn unframe(frame: &[u8]) -> String {
        let end = frame
            .iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |p| p + 1);
        String::from_utf8_lossy(&frame[..end]).into_owned()
    }
}

impl<'a> tokio_util::codec::Encoder<&'a str> for FrameCodec {
    type Error = IRemoteError;

    fn encode(&mut self, item: &'a str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(FRAME_SIZE);
        dst.put_slice(&Self::frame(item));
        Ok(())
    }
}

impl tokio_util::codec::Decoder for FrameCodec {
    type Item = String;
    type Error = IRemoteError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_SIZE {
            return Ok(None);
        }
        let frame = src.split_to(FRAME_SIZE);
        Ok(Some(Self::unframe(&frame)))
    }
}
