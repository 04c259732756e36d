pub mod manila;

pub use manila::{long_date, reference_date, subject_date};
