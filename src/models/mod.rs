pub mod commission;
pub mod invoice;
pub mod order;
pub mod party;
pub mod product;
pub mod user;
