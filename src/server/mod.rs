// Server module entry point
// Listener setup, per-connection serving and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, the module is exposed as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used items
pub use listener::create_listener;
pub use server_loop::run;
pub use signal::shutdown_signal;
