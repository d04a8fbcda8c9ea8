//! Subscriber API: the extension seam for observing the watch session.
//!
//! - [`Subscribe`]: the handler contract;
//! - [`SubscriberSet`]: bounded-queue fan-out with panic isolation;
//! - [`ConsoleReporter`]: the built-in reporter that produces the tool's
//!   console output.

mod console;
mod set;
mod subscriber;

pub use console::ConsoleReporter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
