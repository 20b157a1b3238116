pub mod geo;
pub mod pricing;
pub mod resolver;
pub mod session;
