//! Request middleware.
//!
//! [`Trace`] assigns each request a trace identifier and echoes it back in
//! the `trace-id` response header.

pub mod trace;

pub use trace::Trace;
