//! Venue adapters.

pub mod paper;

pub use paper::{PaperOrder, PaperVenue};
