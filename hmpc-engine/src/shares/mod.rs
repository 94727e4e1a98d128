pub mod beaver;
pub mod bundle;
pub mod share;

pub use beaver::BeaverTriple;
pub use bundle::{BitBundle, Degree, ShareBundle};
pub use share::Sharing;
