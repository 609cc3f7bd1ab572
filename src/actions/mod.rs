//! Page actions
//!
//! An action binds a set of form inputs and an optional click to every URL
//! containing its `url_pattern`. Input values come from a fixed value, the
//! input's own random choices or a shared word list.

mod resolver;
mod value;

pub use resolver::{applicable_actions, ActionResolver};
pub use value::{Resolution, ValueResolver};
