pub mod analytics;
pub mod checkout;
pub mod commission;
