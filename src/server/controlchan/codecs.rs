use super::{command::Command, error::ControlChanError, line_parser, Reply};

use bytes::BytesMut;
use std::io::Write;
use tokio_util::codec::{Decoder, Encoder};

// FtpCodec implements tokio's `Decoder` and `Encoder` traits for the
// control channel: inbound CRLF-terminated lines become commands, outbound
// replies become NNN-prefixed lines with the RFC 959 multi-line convention.
pub struct FtpCodec {
    // Index of the next byte to examine for a '\n', so a line arriving in
    // several reads is only scanned once.
    next_index: usize,
}

impl FtpCodec {
    pub fn new() -> Self {
        FtpCodec { next_index: 0 }
    }
}

impl Decoder for FtpCodec {
    type Item = Command;
    type Error = ControlChanError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Command>, Self::Error> {
        if let Some(newline_offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') {
            let newline_index = newline_offset + self.next_index;
            let line = buf.split_to(newline_index + 1);
            self.next_index = 0;
            Ok(Some(line_parser::parse(line)?))
        } else {
            self.next_index = buf.len();
            Ok(None)
        }
    }
}

impl Encoder<Reply> for FtpCodec {
    type Error = ControlChanError;

    fn encode(&mut self, reply: Reply, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let mut buffer = vec![];
        match reply {
            Reply::None => {
                return Ok(());
            }
            Reply::CodeAndMsg { code, msg } => {
                if msg.is_empty() {
                    write!(buffer, "{}\r\n", code as u32)?;
                } else {
                    write!(buffer, "{} {}\r\n", code as u32, msg)?;
                }
            }
            Reply::MultiLine { code, mut lines } => {
                // The last line carries the bare code; the ones before it
                // get the continuation dash. Lines starting with a digit
                // must be indented so clients don't mistake them for the
                // final line.
                let last_line = lines.pop().unwrap_or_default();
                for line in lines.iter_mut() {
                    if line.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        line.insert(0, ' ');
                    }
                }
                if lines.is_empty() {
                    write!(buffer, "{} {}\r\n", code as u32, last_line)?;
                } else {
                    write!(buffer, "{}-{}\r\n{} {}\r\n", code as u32, lines.join("\r\n"), code as u32, last_line)?;
                }
            }
        }
        buf.extend(&buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::controlchan::ReplyCode;
    use pretty_assertions::assert_eq;

    fn encoded(reply: Reply) -> String {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(reply, &mut buf).unwrap();
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn single_line_reply() {
        let reply = Reply::new(ReplyCode::CommandOkay, "Okay");
        assert_eq!(encoded(reply), "200 Okay\r\n");
    }

    #[test]
    fn multi_line_reply() {
        let reply = Reply::new_multiline(ReplyCode::SystemStatus, vec!["Extensions supported:", "UTF8", "END"]);
        assert_eq!(encoded(reply), "211-Extensions supported:\r\nUTF8\r\n211 END\r\n");
    }

    #[test]
    fn multi_line_indents_leading_digits() {
        let reply = Reply::new_multiline(ReplyCode::FileStatus, vec!["123 here", "END"]);
        assert_eq!(encoded(reply), "213- 123 here\r\n213 END\r\n");
    }

    #[test]
    fn decode_waits_for_a_full_line() {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::from(&b"NOOP"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Command::Noop));
    }
}
