pub mod color;
pub mod key;

pub use color::Color;
pub use key::Key;
