//! Line-delimited JSON-RPC transport.
//!
//! One JSON object per line in both directions: requests arrive on stdin,
//! responses leave on stdout, and nothing else ever touches stdout. Each
//! request is dispatched concurrently; responses are correlated by id and
//! may complete out of order.
//!
//! Submodules:
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based framing
//!   with a maximum inbound line length.
//! - `message`: request envelope, response, and error wire types.
//! - `command`: typed command enum parsed from method name plus params.
//! - `dispatch`: routing from commands to guard, executor, file operations,
//!   and the invoker.
//! - `server`: the serve loop tying reader, handler tasks, and the response
//!   writer together.

pub mod codec;
pub mod command;
pub mod dispatch;
pub mod message;
pub mod server;
