//! Named thread spawning.
//!
//! Every long-running thread gets a name (visible in `top -H`, panics and
//! log output) and an explicit stack size.

use std::io;
use std::thread::{self, JoinHandle};

use log::debug;

/// Stack for threads that block in HTTP / SMTP calls.
pub const IO_STACK_KB: usize = 256;

/// Stack for the timer executor.
pub const TIMER_STACK_KB: usize = 64;

/// Spawn a named thread with an explicit stack size.
pub fn spawn_named(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    debug!("Spawning '{}' (stack={}KB)", name, stack_kb);
    thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
