// Round controller, event loop, and session wiring for the guessing game.

pub mod app;
pub mod logging;
pub mod round;
pub mod session;
