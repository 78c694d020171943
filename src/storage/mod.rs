//! Local persistence of assessed URLs.

mod encrypted;

pub use encrypted::{StoredCheck, VerdictStore};
