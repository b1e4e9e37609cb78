pub mod battery;
pub mod bus;
pub mod config;
pub mod drivers;
pub mod hat;
pub mod interrupt;
pub mod motor;
