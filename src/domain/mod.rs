pub mod marketplace;
pub mod notification;
