//! Line protocol: command framing and sentinel-terminated responses

mod block;
pub mod codec;

pub use block::ResponseBlock;
pub use codec::{LineCodec, LineSource, WireTokens};
