//! The STRU leg of the codec pipeline. FILE passes blocks unchanged.
//! RECORD keeps record boundaries visible: in block and compressed modes
//! the EOR flag already rides in the frame descriptor, in stream mode the
//! boundary is rendered as the RFC 959 escape sequence (0xFF 0x01 for EOR,
//! 0xFF 0x02 for EOF, 0xFF 0x03 for both, a literal 0xFF doubled).
//! PAGE never reaches this codec: STRU P is refused at command time.

use super::DataCodecError;
use crate::server::controlchan::commands::{ModeParam, StruParam};
use crate::storage::DataBlock;

use bytes::{BufMut, BytesMut};

const ESCAPE: u8 = 0xFF;
const MARK_EOR: u8 = 0x01;
const MARK_EOF: u8 = 0x02;
const MARK_EOR_EOF: u8 = 0x03;

#[derive(Debug)]
pub struct StructureCodec {
    structure: StruParam,
    mode: ModeParam,
    // Inbound stream-mode record parsing: an escape byte seen at the end
    // of the previous chunk.
    pending_escape: bool,
    ready: bool,
}

impl StructureCodec {
    pub fn new(structure: StruParam, mode: ModeParam) -> Self {
        StructureCodec {
            structure,
            mode,
            pending_escape: false,
            ready: true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn escaping_active(&self) -> bool {
        self.structure == StruParam::Record && self.mode == ModeParam::Stream
    }

    /// Outbound transform.
    pub fn encode(&mut self, block: DataBlock) -> DataBlock {
        if !self.escaping_active() {
            return block;
        }
        let mut out = BytesMut::with_capacity(block.len() + 4);
        for &byte in block.data.iter() {
            if byte == ESCAPE {
                out.put_u8(ESCAPE);
            }
            out.put_u8(byte);
        }
        match (block.eor, block.eof) {
            (true, true) => {
                out.put_u8(ESCAPE);
                out.put_u8(MARK_EOR_EOF);
            }
            (true, false) => {
                out.put_u8(ESCAPE);
                out.put_u8(MARK_EOR);
            }
            (false, true) => {
                out.put_u8(ESCAPE);
                out.put_u8(MARK_EOF);
            }
            (false, false) => {}
        }
        DataBlock {
            data: out.freeze(),
            // The flags now live inside the payload; the stream carries no
            // out-of-band markers.
            eor: false,
            eof: block.eof,
            restart: block.restart,
            suspect: block.suspect,
        }
    }

    /// Inbound transform. A single wire block may contain several record
    /// boundaries, so this can produce several blocks.
    pub fn decode(&mut self, block: DataBlock) -> Result<Vec<DataBlock>, DataCodecError> {
        if !self.escaping_active() {
            return Ok(vec![block]);
        }
        let mut blocks = Vec::new();
        let mut current = BytesMut::new();
        for &byte in block.data.iter() {
            if self.pending_escape {
                self.pending_escape = false;
                match byte {
                    ESCAPE => current.put_u8(ESCAPE),
                    MARK_EOR => {
                        let mut record = DataBlock::new(current.split().freeze());
                        record.eor = true;
                        blocks.push(record);
                    }
                    MARK_EOF => {
                        let mut last = DataBlock::new(current.split().freeze());
                        last.eof = true;
                        blocks.push(last);
                    }
                    MARK_EOR_EOF => {
                        let mut last = DataBlock::new(current.split().freeze());
                        last.eor = true;
                        last.eof = true;
                        blocks.push(last);
                    }
                    other => return Err(DataCodecError::BadEscape(other)),
                }
            } else if byte == ESCAPE {
                self.pending_escape = true;
            } else {
                current.put_u8(byte);
            }
        }
        if !current.is_empty() || (block.eof && blocks.iter().all(|b| !b.eof)) {
            let mut rest = DataBlock::new(current.freeze());
            rest.eof = block.eof && blocks.iter().all(|b| !b.eof);
            blocks.push(rest);
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_structure_is_transparent() {
        let mut codec = StructureCodec::new(StruParam::File, ModeParam::Stream);
        let block = DataBlock::last(Bytes::from_static(b"abc\xFFdef"));
        let encoded = codec.encode(block.clone());
        assert_eq!(encoded, block);
        assert_eq!(codec.decode(block.clone()).unwrap(), vec![block]);
    }

    #[test]
    fn record_in_block_mode_is_transparent() {
        // EOR rides the frame descriptor there.
        let mut codec = StructureCodec::new(StruParam::Record, ModeParam::Block);
        let mut block = DataBlock::new(Bytes::from_static(b"rec"));
        block.eor = true;
        assert_eq!(codec.encode(block.clone()), block);
    }

    #[test]
    fn record_in_stream_mode_escapes_and_marks() {
        let mut codec = StructureCodec::new(StruParam::Record, ModeParam::Stream);
        let mut block = DataBlock::new(Bytes::from_static(b"a\xFFb"));
        block.eor = true;
        let encoded = codec.encode(block);
        assert_eq!(&encoded.data[..], &[b'a', 0xFF, 0xFF, b'b', 0xFF, MARK_EOR]);
        assert!(!encoded.eor);
    }

    #[test]
    fn record_stream_round_trip_preserves_boundaries() {
        let mut codec = StructureCodec::new(StruParam::Record, ModeParam::Stream);
        let mut first = DataBlock::new(Bytes::from_static(b"one"));
        first.eor = true;
        let mut second = DataBlock::new(Bytes::from_static(b"two\xFF"));
        second.eor = true;
        second.eof = true;

        let mut wire = BytesMut::new();
        wire.extend_from_slice(&codec.encode(first).data);
        wire.extend_from_slice(&codec.encode(second).data);

        let records = codec.decode(DataBlock::last(wire.freeze())).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0].data[..], b"one");
        assert!(records[0].eor);
        assert!(!records[0].eof);
        assert_eq!(&records[1].data[..], b"two\xFF");
        assert!(records[1].eor);
        assert!(records[1].eof);
    }

    #[test]
    fn escape_split_across_chunks_is_carried() {
        let mut codec = StructureCodec::new(StruParam::Record, ModeParam::Stream);
        let first = codec.decode(DataBlock::new(Bytes::from_static(b"ab\xFF"))).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(&first[0].data[..], b"ab");
        let second = codec.decode(DataBlock::new(Bytes::from_static(&[MARK_EOR]))).unwrap();
        assert_eq!(second.len(), 1);
        assert!(second[0].eor);
    }

    #[test]
    fn unknown_escape_is_rejected() {
        let mut codec = StructureCodec::new(StruParam::Record, ModeParam::Stream);
        let result = codec.decode(DataBlock::new(Bytes::from_static(&[0xFF, 0x7E])));
        assert!(matches!(result, Err(DataCodecError::BadEscape(0x7E))));
    }
}
