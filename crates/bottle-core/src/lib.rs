//! Bottle Protocol Core
//!
//! Sans-IO building blocks for talking to a YARP port network over a
//! byte-stream transport: the recursive Bottle codec, control frames, and the
//! state machine that resolves a port name through the nameserver and
//! switches the resulting connection into streaming mode.
//!
//! Nothing in this crate performs I/O. Transports live in `bottle-ws`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod address;
pub mod codec;
pub mod cursor;
pub mod errors;
pub mod frame;
pub mod resolve;
pub mod tag;
pub mod value;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use address::{parse_query_response, Address, Lookup};
pub use codec::{decode, decode_at, encode_words, split_command, Decoded, MAX_WORD_LEN};
pub use cursor::ByteCursor;
pub use errors::{BottleError, DecodeFault, Result};
pub use frame::{Command, ControlFrame, Incoming, PREAMBLE};
pub use resolve::{
    ClosePolicy, Effect, ResolveEvent, ResolveFailure, ResolveMode, ResolveState, Target,
    Transition,
};
pub use tag::Tag;
pub use value::Value;
