pub mod address;
pub mod affiliate;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod commission;
pub mod customer;
pub mod dashboard;
pub mod invoice;
pub mod order;
pub mod product;
pub mod user;
