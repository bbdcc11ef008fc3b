//! The coordinator: turns [`broker_transport::PollEvent`]s into registry
//! updates and outbound bytes, enforcing the one ordering guarantee that
//! spans more than a single connection — a listener always sees a source's
//! announce line before any telemetry line that references it.
//!
//! [`Dispatcher::handle_event`] never touches a socket directly. It records
//! what should be written into an [`ActionQueue`]; the caller drains that
//! queue into the [`broker_transport::Transport`] once `poll_with` has
//! returned control, which keeps the dispatcher's single mutable borrow of
//! its registries independent of the transport's. See `DESIGN.md` for why.

mod actions;
mod dispatcher;
mod lines;

pub use actions::{Action, ActionQueue};
pub use dispatcher::Dispatcher;
