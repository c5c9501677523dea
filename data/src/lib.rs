pub mod schema;

mod catalog;
pub use catalog::*;

mod events;
pub use events::*;

mod maps;
pub use maps::*;
