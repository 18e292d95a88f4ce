//! Git protocol v2 wire format.
//!
//! [`pktline`] frames and unframes raw packet lines; [`request`] groups them
//! into protocol v2 commands. Parsing and re-encoding round-trips to
//! byte-identical output.

pub mod pktline;
pub mod request;
