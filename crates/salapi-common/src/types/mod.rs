//! Core types for SALAPI

pub mod access;
pub mod principal;
