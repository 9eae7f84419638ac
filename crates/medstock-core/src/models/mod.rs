//! Domain models for the medstock system.

mod alert;
mod consultation;
mod filter;
mod lot;
mod medication;
mod movement;
mod patient;
mod prescription;
mod user;

pub use alert::*;
pub use consultation::*;
pub use filter::*;
pub use lot::*;
pub use medication::*;
pub use movement::*;
pub use patient::*;
pub use prescription::*;
pub use user::*;
