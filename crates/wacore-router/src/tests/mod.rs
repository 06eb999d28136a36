//! Crate-level fixtures and behavioural tests.

pub(crate) mod support;
