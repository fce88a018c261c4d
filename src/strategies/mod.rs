pub mod quick_flip;
pub mod types;
