//! Homing/probing coordination (C11).

pub mod homing;
