pub mod alias;
pub mod instruction;
pub mod job;
pub mod notification;
pub mod ports;
pub mod risk;
