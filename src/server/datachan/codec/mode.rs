//! The MODE leg of the codec pipeline: STREAM passes bytes through, BLOCK
//! frames every [`DataBlock`] behind a three-byte header whose descriptor
//! carries the EOR/EOF/restart/suspect flags, COMPRESSED additionally
//! run-length encodes the frame payload.

use super::DataCodecError;
use crate::server::controlchan::commands::ModeParam;
use crate::storage::DataBlock;

use bytes::{Buf, BufMut, Bytes, BytesMut};

// RFC 959 block mode descriptor bits.
pub const DESC_EOR: u8 = 0x80;
pub const DESC_EOF: u8 = 0x40;
pub const DESC_SUSPECT: u8 = 0x20;
pub const DESC_RESTART: u8 = 0x10;

// The frame length field is 16 bits.
const MAX_FRAME_PAYLOAD: usize = 0xFFFF;
// Input chunk for compression, chosen so the worst-case expansion
// (count byte per 127 raw bytes) still fits one frame.
const COMPRESS_SEGMENT: usize = 0xF000;

#[derive(Debug)]
pub struct ModeCodec {
    mode: ModeParam,
    // Gates data flow: nothing passes until the transfer controller has
    // flushed the 150 reply and unlocked the pipeline.
    ready: bool,
    // Decode side, stream mode: the end-of-stream block was produced.
    emitted_stream_eof: bool,
}

impl ModeCodec {
    pub fn new(mode: ModeParam) -> Self {
        ModeCodec {
            mode,
            ready: false,
            emitted_stream_eof: false,
        }
    }

    pub fn set_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn encode(&mut self, block: DataBlock, dst: &mut BytesMut) -> Result<(), DataCodecError> {
        if !self.ready {
            return Err(DataCodecError::NotReady);
        }
        match self.mode {
            ModeParam::Stream => {
                // Flags travel out of band in stream mode: EOF is the
                // connection close, EOR (record structure) was rendered by
                // the structure codec.
                dst.extend_from_slice(&block.data);
                Ok(())
            }
            ModeParam::Block => {
                encode_frames(&block, &block.data, false, dst);
                Ok(())
            }
            ModeParam::Compressed => {
                encode_frames(&block, &block.data, true, dst);
                Ok(())
            }
        }
    }

    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<DataBlock>, DataCodecError> {
        if !self.ready {
            return Err(DataCodecError::NotReady);
        }
        match self.mode {
            ModeParam::Stream => {
                if src.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(DataBlock::new(src.split().freeze())))
                }
            }
            ModeParam::Block => self.decode_frame(src, false),
            ModeParam::Compressed => self.decode_frame(src, true),
        }
    }

    pub fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<DataBlock>, DataCodecError> {
        match self.mode {
            ModeParam::Stream => {
                if !src.is_empty() {
                    let mut block = DataBlock::new(src.split().freeze());
                    block.eof = true;
                    self.emitted_stream_eof = true;
                    return Ok(Some(block));
                }
                if self.emitted_stream_eof {
                    Ok(None)
                } else {
                    self.emitted_stream_eof = true;
                    Ok(Some(DataBlock::terminator()))
                }
            }
            ModeParam::Block | ModeParam::Compressed => {
                if src.is_empty() {
                    // A well-behaved sender closed after the EOF frame.
                    Ok(None)
                } else if let Some(block) = self.decode(src)? {
                    Ok(Some(block))
                } else {
                    Err(DataCodecError::BadFrame("connection closed inside a frame"))
                }
            }
        }
    }

    // A partial header or partial payload stays buffered until the rest of
    // the frame arrives.
    fn decode_frame(&mut self, src: &mut BytesMut, compressed: bool) -> Result<Option<DataBlock>, DataCodecError> {
        if src.len() < 3 {
            return Ok(None);
        }
        let descriptor = src[0];
        let len = usize::from(src[1]) << 8 | usize::from(src[2]);
        if src.len() < 3 + len {
            src.reserve(3 + len - src.len());
            return Ok(None);
        }
        src.advance(3);
        let payload = src.split_to(len).freeze();
        let data = if compressed { expand(&payload)? } else { payload };
        Ok(Some(DataBlock {
            data,
            eof: descriptor & DESC_EOF != 0,
            eor: descriptor & DESC_EOR != 0,
            restart: descriptor & DESC_RESTART != 0,
            suspect: descriptor & DESC_SUSPECT != 0,
        }))
    }
}

fn descriptor_of(block: &DataBlock) -> u8 {
    let mut descriptor = 0;
    if block.eor {
        descriptor |= DESC_EOR;
    }
    if block.eof {
        descriptor |= DESC_EOF;
    }
    if block.suspect {
        descriptor |= DESC_SUSPECT;
    }
    if block.restart {
        descriptor |= DESC_RESTART;
    }
    descriptor
}

// Emits one or more frames for the block; the flags ride on the final
// frame only, so a block larger than the 16-bit length field keeps its
// meaning.
fn encode_frames(block: &DataBlock, data: &[u8], compressed: bool, dst: &mut BytesMut) {
    let segment = if compressed { COMPRESS_SEGMENT } else { MAX_FRAME_PAYLOAD };
    let mut chunks: Vec<&[u8]> = data.chunks(segment).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }
    let last = chunks.len() - 1;
    for (i, chunk) in chunks.into_iter().enumerate() {
        let descriptor = if i == last { descriptor_of(block) } else { 0 };
        if compressed {
            let mut payload = BytesMut::new();
            compress(chunk, &mut payload);
            put_frame(descriptor, &payload, dst);
        } else {
            put_frame(descriptor, chunk, dst);
        }
    }
}

fn put_frame(descriptor: u8, payload: &[u8], dst: &mut BytesMut) {
    debug_assert!(payload.len() <= MAX_FRAME_PAYLOAD);
    dst.reserve(3 + payload.len());
    dst.put_u8(descriptor);
    dst.put_u8((payload.len() >> 8) as u8);
    dst.put_u8(payload.len() as u8);
    dst.extend_from_slice(payload);
}

// Run-length coding per RFC 959 compressed mode: a 0nnnnnnn count byte
// precedes up to 127 raw bytes, a 10nnnnnn byte plus one data byte stands
// for up to 63 replications. We emit raw and replicated tokens; inbound we
// also accept the 11nnnnnn filler token (n spaces).
fn compress(input: &[u8], out: &mut BytesMut) {
    let mut raw_start = 0;
    let mut i = 0;
    while i < input.len() {
        let byte = input[i];
        let mut run = 1;
        while i + run < input.len() && input[i + run] == byte && run < 63 {
            run += 1;
        }
        if run >= 3 {
            flush_raw(&input[raw_start..i], out);
            out.put_u8(0x80 | run as u8);
            out.put_u8(byte);
            i += run;
            raw_start = i;
        } else {
            i += run;
        }
    }
    flush_raw(&input[raw_start..], out);
}

fn flush_raw(mut raw: &[u8], out: &mut BytesMut) {
    while !raw.is_empty() {
        let n = raw.len().min(127);
        out.put_u8(n as u8);
        out.extend_from_slice(&raw[..n]);
        raw = &raw[n..];
    }
}

fn expand(input: &[u8]) -> Result<Bytes, DataCodecError> {
    let mut out = BytesMut::new();
    let mut i = 0;
    while i < input.len() {
        let token = input[i];
        i += 1;
        if token & 0x80 == 0 {
            let count = usize::from(token);
            if count == 0 || i + count > input.len() {
                return Err(DataCodecError::BadToken(token));
            }
            out.extend_from_slice(&input[i..i + count]);
            i += count;
        } else if token & 0x40 == 0 {
            let count = usize::from(token & 0x3F);
            if count == 0 || i >= input.len() {
                return Err(DataCodecError::BadToken(token));
            }
            out.put_bytes(input[i], count);
            i += 1;
        } else {
            let count = usize::from(token & 0x3F);
            if count == 0 {
                return Err(DataCodecError::BadToken(token));
            }
            out.put_bytes(b' ', count);
        }
    }
    Ok(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn armed(mode: ModeParam) -> ModeCodec {
        let mut codec = ModeCodec::new(mode);
        codec.set_ready();
        codec
    }

    #[test]
    fn locked_codec_refuses_data() {
        let mut codec = ModeCodec::new(ModeParam::Stream);
        let mut dst = BytesMut::new();
        assert!(matches!(
            codec.encode(DataBlock::new(Bytes::from_static(b"x")), &mut dst),
            Err(DataCodecError::NotReady)
        ));
    }

    #[test]
    fn stream_is_byte_transparent() {
        let mut codec = armed(ModeParam::Stream);
        let mut dst = BytesMut::new();
        codec.encode(DataBlock::new(Bytes::from_static(b"hello")), &mut dst).unwrap();
        assert_eq!(&dst[..], b"hello");
        let block = codec.decode(&mut dst).unwrap().unwrap();
        assert_eq!(&block.data[..], b"hello");
    }

    #[test]
    fn stream_eof_is_the_connection_close() {
        let mut codec = armed(ModeParam::Stream);
        let mut src = BytesMut::new();
        let block = codec.decode_eof(&mut src).unwrap().unwrap();
        assert!(block.eof);
        assert!(block.is_empty());
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn block_frame_carries_flags_verbatim() {
        let mut codec = armed(ModeParam::Block);
        let mut wire = BytesMut::new();
        let mut block = DataBlock::new(Bytes::from_static(b"abc"));
        block.eof = true;
        block.eor = true;
        codec.encode(block, &mut wire).unwrap();
        assert_eq!(&wire[..], &[DESC_EOR | DESC_EOF, 0, 3, b'a', b'b', b'c']);

        let decoded = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(&decoded.data[..], b"abc");
        assert!(decoded.eof);
        assert!(decoded.eor);
    }

    #[test]
    fn partial_header_buffers_until_complete() {
        let mut codec = armed(ModeParam::Block);
        let mut wire = BytesMut::new();
        codec.encode(DataBlock::last(Bytes::from_static(b"xyz")), &mut wire).unwrap();

        // Feed the frame one byte at a time, as the network may.
        let full = wire.split().freeze();
        let mut trickle = BytesMut::new();
        for (i, byte) in full.iter().enumerate() {
            trickle.extend_from_slice(&[*byte]);
            let result = codec.decode(&mut trickle).unwrap();
            if i + 1 < full.len() {
                assert_eq!(result, None, "frame complete too early at byte {}", i);
            } else {
                let block = result.unwrap();
                assert_eq!(&block.data[..], b"xyz");
                assert!(block.eof);
            }
        }
    }

    #[test]
    fn oversized_blocks_split_into_frames_with_flags_on_the_last() {
        let mut codec = armed(ModeParam::Block);
        let mut wire = BytesMut::new();
        let data = vec![7u8; MAX_FRAME_PAYLOAD + 10];
        codec.encode(DataBlock::last(Bytes::from(data.clone())), &mut wire).unwrap();

        let first = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(first.len(), MAX_FRAME_PAYLOAD);
        assert!(!first.eof);
        let second = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(second.len(), 10);
        assert!(second.eof);
    }

    #[test]
    fn run_length_round_trip() {
        let mut input = Vec::new();
        input.extend_from_slice(b"abcdef");
        input.extend_from_slice(&[0u8; 200]);
        input.extend_from_slice(b"tail");
        let mut compressed = BytesMut::new();
        compress(&input, &mut compressed);
        assert!(compressed.len() < input.len());
        assert_eq!(&expand(&compressed).unwrap()[..], &input[..]);
    }

    #[test]
    fn filler_tokens_expand_to_spaces() {
        assert_eq!(&expand(&[0xC0 | 4]).unwrap()[..], b"    ");
    }

    #[test]
    fn corrupt_tokens_are_rejected() {
        assert!(matches!(expand(&[0x00]), Err(DataCodecError::BadToken(0))));
        assert!(matches!(expand(&[0x05, b'a']), Err(DataCodecError::BadToken(0x05))));
    }

    #[test]
    fn compressed_mode_round_trip() {
        let mut codec = armed(ModeParam::Compressed);
        let mut wire = BytesMut::new();
        let data = Bytes::from(vec![b'z'; 1000]);
        codec.encode(DataBlock::last(data.clone()), &mut wire).unwrap();
        assert!(wire.len() < data.len());
        let decoded = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(decoded.data, data);
        assert!(decoded.eof);
    }
}
