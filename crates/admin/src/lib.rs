//! Operator CLI for staged content items.
//!
//! [`cli`] defines the command line, [`actor`] resolves the acting operator
//! from the environment, and [`commands`] runs one command against a
//! [`pagestage_core::StagingService`].

pub mod actor;
pub mod cli;
pub mod commands;
