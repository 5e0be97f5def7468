pub mod paths;
pub mod strand;

pub use strand::Strand;
