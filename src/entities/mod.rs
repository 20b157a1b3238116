pub mod order;
pub mod servery;
pub mod user;
