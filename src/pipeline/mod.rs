pub mod color;
pub mod depth;
pub mod orientation;
pub mod presence;
pub mod projection;
pub mod session;
pub mod skeleton;
pub mod update_loop;
pub mod users;

// Re-exports for convenience
pub use update_loop::{Bridge, start_update_loop};
