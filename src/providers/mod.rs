pub mod caching;
pub mod cbr;
pub mod util;
