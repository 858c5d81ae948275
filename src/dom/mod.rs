pub mod document;
pub mod extract;
pub mod html;
pub mod range;
pub mod text;

pub use document::*;
pub use extract::*;
pub use range::*;
pub use text::*;
