pub mod play;
pub mod search;
pub mod utils;
