//! Registry fixture utilities

#![allow(dead_code)]

mod fixture;

pub use fixture::*;
