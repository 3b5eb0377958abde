//! HTTP handlers

pub mod health;
pub mod alerts;
pub mod assets;
pub mod kpis;
pub mod reports;
pub mod status;
pub mod stream;
