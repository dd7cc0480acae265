// Parser module: turns scraped element text into prices.

pub mod price_parser;

pub use price_parser::extract_price;
