pub mod scan;
pub mod printer;

#[cfg(target_os = "linux")]
pub mod joystick;

#[cfg(not(target_os = "linux"))]
pub use crate::stubs::joystick;
