pub mod scrape;
mod time;

pub use time::format_time;
