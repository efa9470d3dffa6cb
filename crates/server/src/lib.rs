//! HTTP front end for the ExoScope prediction service

pub mod api;
pub mod config;
