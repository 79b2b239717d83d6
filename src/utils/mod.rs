//! Small helpers shared across the crate.

mod math;

pub use math::{align_up, align_up_usize, to_u32};
