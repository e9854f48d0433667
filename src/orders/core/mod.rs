//! orders::core: inputs, calendar conventions, configuration and events
//! shared by the fitter, the evaluator and the forecast generator.
pub mod calendar;
pub mod config;
pub mod data;
pub mod events;
pub mod partitions;
