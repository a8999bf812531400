#![no_std]

pub mod clocks;
pub mod drivers;
pub mod pins;
pub mod tasks;
