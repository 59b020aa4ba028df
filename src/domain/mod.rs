pub mod reading;

pub use reading::*;
