//! Core logic: features, detectors, ensemble, fan-out and the pipeline loop

pub mod assets;
pub mod detectors;
pub mod ensemble;
pub mod features;
pub mod hub;
pub mod kpi;
pub mod pipeline;
pub mod source;
