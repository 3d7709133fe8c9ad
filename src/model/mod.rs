mod hit;
mod identity;

pub use hit::{FrontierStats, Hit};
pub use identity::{EntityKind, canonicalize};
