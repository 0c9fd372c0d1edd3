pub mod privacy;
pub mod progression;
