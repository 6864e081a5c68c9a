pub mod envelope;
pub mod object;
