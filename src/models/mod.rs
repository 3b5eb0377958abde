//! Data models

pub mod alert;
pub mod reported_ip;

pub use alert::*;
pub use reported_ip::*;
