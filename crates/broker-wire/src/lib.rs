//! Pure wire codec for the source protocol: no sockets, no state, just byte
//! buffers in and structured frames out (or vice versa).
//!
//! Everything here is a free function over `&[u8]`/`Vec<u8>`. Ownership of
//! connections and registries lives one layer up, in `broker-dispatch`.

mod ack;
mod frame;
mod xor;

pub use ack::{Ack, ACK_FRAME_SIZE, encode_ack};
pub use frame::{
    FrameError, RECORD_SIZE, SOURCE_ID_SIZE, SourceFrame, SourceState, TelemetryItem,
    encode_source_frame, parse_source_frame,
};
pub use xor::xor_fold;
