pub mod config;
pub mod tokenize;
pub mod indexer;
pub mod meets;
pub mod marker;
pub mod scene;
pub mod selection;
pub mod page;
pub mod change;
pub mod cortex;

pub use config::*;
pub use tokenize::*;
pub use indexer::*;
pub use meets::*;
pub use marker::*;
pub use scene::*;
pub use selection::*;
pub use page::*;
pub use change::*;
pub use cortex::*;
