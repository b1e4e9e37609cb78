// Device drivers
pub mod pca9685; // Pca9685
pub mod dc_motor; // DcMotor
pub mod ads7830; // Ads7830, AnalogIn
