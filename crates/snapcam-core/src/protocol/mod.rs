//! Protocol module containing the request grammar and the response framing.

pub mod command;
pub mod framing;

pub use command::{Command, READ_BUFFER_SIZE, TAKE_PHOTO};
pub use framing::{
    decode_length_prefix, decode_response_frame, encode_length_prefix, encode_response_frame,
    ProtocolError, LENGTH_PREFIX_SIZE,
};
