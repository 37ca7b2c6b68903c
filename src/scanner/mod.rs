//! Cache file scanner: header reader, key matcher, directory walker, deletion.

pub mod deletion;
pub mod header;
pub mod matcher;
pub mod session;
pub mod walker;
