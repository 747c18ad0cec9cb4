//! CLI command implementations

pub mod config;
pub mod inline;
pub mod inspect;
pub mod load;

pub use config::execute as config;
pub use inline::execute as inline;
pub use inspect::execute as inspect;
pub use load::execute as load;
