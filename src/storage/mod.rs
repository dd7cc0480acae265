// Storage module: persistence of finished snapshots.

pub mod json;

pub use json::JsonStorage;
