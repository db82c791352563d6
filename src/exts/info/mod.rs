pub mod help;
pub mod tags;
