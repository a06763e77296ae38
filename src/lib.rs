#![warn(clippy::pedantic)]
// Noisy doc/signature lints — would require annotating most pub functions
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Coordinate comparisons and money arithmetic use the natural types
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

pub mod arbitration;
pub mod broadcast;
pub mod bus;
pub mod cart;
pub mod catalog;
pub mod channels;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod gateway;
pub mod geofence;
pub mod order;
pub mod payment;
pub mod schedule;
pub mod session;
pub mod texts;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
