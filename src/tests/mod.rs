//! Crate-level tests exercising the full discovery stack.
