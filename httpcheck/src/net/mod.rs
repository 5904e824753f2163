pub(crate) mod connect;
pub(crate) mod listen;
pub(crate) mod rewind;
pub(crate) mod socket;
