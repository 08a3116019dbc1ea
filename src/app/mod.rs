//! Broker binary: argument handling and process startup

pub mod cli;
pub mod startup;
