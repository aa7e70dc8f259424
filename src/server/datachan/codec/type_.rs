//! The TYPE leg of the codec pipeline: ASCII translates the line-ending
//! convention between disk (LF) and wire (CRLF), EBCDIC translates through
//! a fixed codepage table, IMAGE and LOCAL pass bytes unchanged.

use crate::server::controlchan::commands::TypeParam;

use bytes::{BufMut, Bytes, BytesMut};
use lazy_static::lazy_static;

// ISO 8859-1 to EBCDIC codepage 37, the table IBM hosts expect.
#[rustfmt::skip]
const ASCII_TO_EBCDIC: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x37, 0x2D, 0x2E, 0x2F, 0x16, 0x05, 0x25, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x3C, 0x3D, 0x32, 0x26, 0x18, 0x19, 0x3F, 0x27, 0x1C, 0x1D, 0x1E, 0x1F,
    0x40, 0x5A, 0x7F, 0x7B, 0x5B, 0x6C, 0x50, 0x7D, 0x4D, 0x5D, 0x5C, 0x4E, 0x6B, 0x60, 0x4B, 0x61,
    0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0x7A, 0x5E, 0x4C, 0x7E, 0x6E, 0x6F,
    0x7C, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6,
    0xD7, 0xD8, 0xD9, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xBA, 0xE0, 0xBB, 0xB0, 0x6D,
    0x79, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xC0, 0x4F, 0xD0, 0xA1, 0x07,
    0x20, 0x21, 0x22, 0x23, 0x24, 0x15, 0x06, 0x17, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x09, 0x0A, 0x1B,
    0x30, 0x31, 0x1A, 0x33, 0x34, 0x35, 0x36, 0x08, 0x38, 0x39, 0x3A, 0x3B, 0x04, 0x14, 0x3E, 0xFF,
    0x41, 0xAA, 0x4A, 0xB1, 0x9F, 0xB2, 0x6A, 0xB5, 0xBD, 0xB4, 0x9A, 0x8A, 0x5F, 0xCA, 0xAF, 0xBC,
    0x90, 0x8F, 0xEA, 0xFA, 0xBE, 0xA0, 0xB6, 0xB3, 0x9D, 0xDA, 0x9B, 0x8B, 0xB7, 0xB8, 0xB9, 0xAB,
    0x64, 0x65, 0x62, 0x66, 0x63, 0x67, 0x9E, 0x68, 0x74, 0x71, 0x72, 0x73, 0x78, 0x75, 0x76, 0x77,
    0xAC, 0x69, 0xED, 0xEE, 0xEB, 0xEF, 0xEC, 0xBF, 0x80, 0xFD, 0xFE, 0xFB, 0xFC, 0xAD, 0xAE, 0x59,
    0x44, 0x45, 0x42, 0x46, 0x43, 0x47, 0x9C, 0x48, 0x54, 0x51, 0x52, 0x53, 0x58, 0x55, 0x56, 0x57,
    0x8C, 0x49, 0xCD, 0xCE, 0xCB, 0xCF, 0xCC, 0xE1, 0x70, 0xDD, 0xDE, 0xDB, 0xDC, 0x8D, 0x8E, 0xDF,
];

lazy_static! {
    // The table is a permutation, so the inverse is total.
    static ref EBCDIC_TO_ASCII: [u8; 256] = {
        let mut inverse = [0u8; 256];
        for (ascii, &ebcdic) in ASCII_TO_EBCDIC.iter().enumerate() {
            inverse[usize::from(ebcdic)] = ascii as u8;
        }
        inverse
    };
}

#[derive(Debug)]
pub struct TypeCodec {
    data_type: TypeParam,
    // Inbound ASCII: a CR seen at the end of the previous chunk, awaiting
    // its LF.
    pending_cr: bool,
    ready: bool,
}

impl TypeCodec {
    pub fn new(data_type: TypeParam) -> Self {
        TypeCodec {
            data_type,
            pending_cr: false,
            ready: true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Outbound payload transform, local convention to wire convention.
    pub fn encode_payload(&mut self, data: Bytes) -> Bytes {
        match self.data_type {
            TypeParam::Image | TypeParam::Local(_) => data,
            TypeParam::Ascii => {
                let mut out = BytesMut::with_capacity(data.len() + data.len() / 16);
                for &byte in data.iter() {
                    if byte == b'\n' {
                        out.put_u8(b'\r');
                    }
                    out.put_u8(byte);
                }
                out.freeze()
            }
            TypeParam::Ebcdic => translate(&data, &ASCII_TO_EBCDIC),
        }
    }

    /// Inbound payload transform, wire convention to local convention.
    /// `last` tells the codec this is the final payload of the transfer so
    /// a dangling CR can be flushed instead of held back.
    pub fn decode_payload(&mut self, data: Bytes, last: bool) -> Bytes {
        match self.data_type {
            TypeParam::Image | TypeParam::Local(_) => data,
            TypeParam::Ascii => {
                let mut out = BytesMut::with_capacity(data.len());
                for &byte in data.iter() {
                    if self.pending_cr {
                        self.pending_cr = false;
                        if byte != b'\n' {
                            out.put_u8(b'\r');
                        }
                    }
                    if byte == b'\r' {
                        self.pending_cr = true;
                    } else {
                        out.put_u8(byte);
                    }
                }
                if last && self.pending_cr {
                    self.pending_cr = false;
                    out.put_u8(b'\r');
                }
                out.freeze()
            }
            TypeParam::Ebcdic => translate(&data, &EBCDIC_TO_ASCII),
        }
    }
}

fn translate(data: &[u8], table: &[u8; 256]) -> Bytes {
    data.iter().map(|&b| table[usize::from(b)]).collect::<Vec<u8>>().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn image_passes_bytes_unchanged() {
        let mut codec = TypeCodec::new(TypeParam::Image);
        let data = Bytes::from_static(&[0x00, 0x0A, 0x0D, 0xFF]);
        assert_eq!(codec.encode_payload(data.clone()), data);
        assert_eq!(codec.decode_payload(data.clone(), true), data);
    }

    #[test]
    fn ascii_outbound_expands_lf_to_crlf() {
        let mut codec = TypeCodec::new(TypeParam::Ascii);
        let out = codec.encode_payload(Bytes::from_static(b"one\ntwo\n"));
        assert_eq!(&out[..], b"one\r\ntwo\r\n");
    }

    #[test]
    fn ascii_inbound_collapses_crlf() {
        let mut codec = TypeCodec::new(TypeParam::Ascii);
        let out = codec.decode_payload(Bytes::from_static(b"one\r\ntwo\r\n"), true);
        assert_eq!(&out[..], b"one\ntwo\n");
    }

    #[test]
    fn ascii_inbound_handles_crlf_split_across_chunks() {
        let mut codec = TypeCodec::new(TypeParam::Ascii);
        let first = codec.decode_payload(Bytes::from_static(b"one\r"), false);
        assert_eq!(&first[..], b"one");
        let second = codec.decode_payload(Bytes::from_static(b"\ntwo"), false);
        assert_eq!(&second[..], b"\ntwo");
    }

    #[test]
    fn ascii_inbound_flushes_dangling_cr_at_end() {
        let mut codec = TypeCodec::new(TypeParam::Ascii);
        let out = codec.decode_payload(Bytes::from_static(b"tail\r"), true);
        assert_eq!(&out[..], b"tail\r");
    }

    #[test]
    fn ascii_round_trip_modulo_line_endings() {
        let mut codec = TypeCodec::new(TypeParam::Ascii);
        let local = Bytes::from_static(b"alpha\nbeta\ngamma");
        let wire = codec.encode_payload(local.clone());
        assert_eq!(codec.decode_payload(wire, true), local);
    }

    #[test]
    fn ebcdic_table_is_a_permutation() {
        let mut seen = [false; 256];
        for &b in ASCII_TO_EBCDIC.iter() {
            assert!(!seen[usize::from(b)], "duplicate target {:#x}", b);
            seen[usize::from(b)] = true;
        }
    }

    #[test]
    fn ebcdic_round_trips_every_byte() {
        let mut codec = TypeCodec::new(TypeParam::Ebcdic);
        let all: Vec<u8> = (0..=255u8).collect();
        let wire = codec.encode_payload(Bytes::from(all.clone()));
        assert_eq!(&codec.decode_payload(wire, true)[..], &all[..]);
    }

    #[test]
    fn ebcdic_translates_known_codepoints() {
        let mut codec = TypeCodec::new(TypeParam::Ebcdic);
        // 'A' is 0xC1 and space is 0x40 in codepage 37.
        let wire = codec.encode_payload(Bytes::from_static(b"A "));
        assert_eq!(&wire[..], &[0xC1, 0x40]);
    }
}
