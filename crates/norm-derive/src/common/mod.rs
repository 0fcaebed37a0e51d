//! Helpers shared by the derive macros.

pub mod syn_types;
