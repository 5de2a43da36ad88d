// Presentation layer - The chart view task and the HTTP control surface
pub mod app_state;
pub mod console;
pub mod handlers;
pub mod renderer;
