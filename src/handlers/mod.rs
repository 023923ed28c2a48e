pub mod client;
pub mod dashboard;
pub mod invoice;
pub mod lines;
pub mod product;
pub mod quote;
pub mod user;
