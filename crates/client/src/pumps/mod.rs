//! Per-session I/O: the read loop task and the write half used by `send`.

pub(crate) mod read;
pub(crate) mod write;
