//! Explicit state machines driving interactive widgets.

pub mod interaction_sm;
