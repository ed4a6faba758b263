pub mod normalize;
pub mod rules;
pub mod tree;

pub use normalize::{NormalizeOptions, NormalizeReport, Normalizer};
pub use tree::{Element, Node, QName, SvgDocument};
