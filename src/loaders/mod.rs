//! Turn the files deposited by the data collectors into in-memory tables.

pub mod inflation;
pub mod market;
pub mod reference;
