//! Route handlers

pub mod emotions;
pub mod stream;
