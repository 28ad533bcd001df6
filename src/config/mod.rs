pub mod preferences;

pub use preferences::{ Model, Preferences, Theme };
