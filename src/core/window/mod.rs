// Adaptive window sizing

pub mod controller;

pub use controller::WindowController;
