//! Implementation of the `ptdump` inspection tool.

pub mod commands;
