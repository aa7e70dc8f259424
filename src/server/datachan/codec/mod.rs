//! The data-channel codec pipeline: three stacked transforms, MODE
//! outermost on the wire, then TYPE, then STRU nearest the file. Outbound
//! blocks pass STRU, TYPE, MODE in that order; inbound bytes the reverse.
//! A fresh pipeline is instantiated from the session's [`CodecConfig`] for
//! every data connection, so MODE/TYPE/STRU commands never mutate a stack
//! that is in flight.

pub mod mode;
pub mod structure;
pub mod type_;

use crate::server::controlchan::commands::{ModeParam, StruParam, TypeParam};
use crate::storage::DataBlock;
use mode::ModeCodec;
use structure::StructureCodec;
use type_::TypeCodec;

use bytes::BytesMut;
use std::collections::VecDeque;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// The error type produced by the codec pipeline.
#[derive(Debug, Error)]
pub enum DataCodecError {
    /// Data was pushed through a pipeline that has not been unlocked yet.
    #[error("codec pipeline is not armed")]
    NotReady,
    /// A BLOCK frame violated the framing rules.
    #[error("corrupt BLOCK frame: {0}")]
    BadFrame(&'static str),
    /// A COMPRESSED run-length token was malformed or truncated.
    #[error("corrupt run-length token {0:#04x}")]
    BadToken(u8),
    /// A RECORD escape sequence carried an unknown marker.
    #[error("unknown record escape marker {0:#04x}")]
    BadEscape(u8),
    /// The underlying channel failed.
    #[error("data channel IO error")]
    Io(#[from] std::io::Error),
}

/// The session's transfer settings, the value MODE/TYPE/STRU commands
/// operate on. RFC 959 defaults: stream mode, ASCII type, file structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub mode: ModeParam,
    pub data_type: TypeParam,
    pub structure: StruParam,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            mode: ModeParam::Stream,
            data_type: TypeParam::Ascii,
            structure: StruParam::File,
        }
    }
}

/// The stacked codec driving one data connection, plugged into a
/// [`tokio_util::codec::Framed`].
#[derive(Debug)]
pub struct DataCodec {
    mode: ModeCodec,
    data_type: TypeCodec,
    structure: StructureCodec,
    // Inbound record parsing can yield several blocks per frame; the
    // surplus queues here until the next decode call.
    pending: VecDeque<DataBlock>,
}

impl DataCodec {
    pub fn new(config: CodecConfig) -> Self {
        DataCodec {
            mode: ModeCodec::new(config.mode),
            data_type: TypeCodec::new(config.data_type),
            structure: StructureCodec::new(config.structure, config.mode),
            pending: VecDeque::new(),
        }
    }

    /// Unlocks the pipeline. Called by the data task once the transfer
    /// controller signals that the 150 reply is on the wire.
    pub fn set_ready(&mut self) {
        self.mode.set_ready();
    }

    /// The pipeline passes data only when all three codecs are ready.
    pub fn is_ready(&self) -> bool {
        self.mode.is_ready() && self.data_type.is_ready() && self.structure.is_ready()
    }

    fn post_decode(&mut self, block: DataBlock) -> Result<Option<DataBlock>, DataCodecError> {
        let last = block.eof;
        let translated = DataBlock {
            data: self.data_type.decode_payload(block.data, last),
            ..block
        };
        let mut blocks = self.structure.decode(translated)?;
        if blocks.is_empty() {
            return Ok(None);
        }
        let first = blocks.remove(0);
        self.pending.extend(blocks);
        Ok(Some(first))
    }
}

impl Encoder<DataBlock> for DataCodec {
    type Error = DataCodecError;

    fn encode(&mut self, block: DataBlock, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if !self.is_ready() {
            return Err(DataCodecError::NotReady);
        }
        let block = self.structure.encode(block);
        let block = DataBlock {
            data: self.data_type.encode_payload(block.data),
            ..block
        };
        self.mode.encode(block, dst)
    }
}

impl Decoder for DataCodec {
    type Item = DataBlock;
    type Error = DataCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<DataBlock>, Self::Error> {
        if !self.is_ready() {
            return Err(DataCodecError::NotReady);
        }
        if let Some(block) = self.pending.pop_front() {
            return Ok(Some(block));
        }
        match self.mode.decode(src)? {
            Some(block) => self.post_decode(block),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<DataBlock>, Self::Error> {
        if let Some(block) = self.pending.pop_front() {
            return Ok(Some(block));
        }
        match self.mode.decode_eof(src)? {
            Some(block) => self.post_decode(block),
            None => Ok(None),
        }
    }
}
