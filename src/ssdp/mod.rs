pub mod messages;
pub mod service;
pub mod socket;
