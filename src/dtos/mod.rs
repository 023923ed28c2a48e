pub mod client;
pub mod dashboard;
pub mod document;
pub mod invoice;
pub mod product;
pub mod quote;
pub mod user;
