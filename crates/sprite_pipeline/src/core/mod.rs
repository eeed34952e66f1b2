//! Core pipeline configuration

pub mod config;
