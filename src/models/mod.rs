pub mod client;
pub mod invoice;
pub mod product;
pub mod quote;
pub mod user;
