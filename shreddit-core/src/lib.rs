pub mod account;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod filter;
pub mod sentence;
pub mod types;

pub use account::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use filter::decide;
pub use sentence::*;
pub use types::*;
