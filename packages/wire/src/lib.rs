//! Wire protocol shared by the folio API and its clients.
//!
//! A chat turn travels as a sequence of `data: <json>\n\n` lines: one metadata
//! frame naming the presentation component, any number of text frames, and a
//! terminal `data: [DONE]` marker.

pub mod decoder;
pub mod frame;
pub mod line_buffer;
pub mod tag;

pub use decoder::{decode_line, DecodedLine, FrameDecoder};
pub use frame::{encode_done, StreamFrame, WireError, DATA_PREFIX, DONE_MARKER};
pub use line_buffer::LineBuffer;
pub use tag::PresentationTag;
