#![allow(dead_code)]

pub mod builders;
pub mod fixtures;
pub mod sources;

pub use builders::{AclBuilder, SessionBuilder};
pub use fixtures::TestEnv;
pub use sources::{FailingDirectory, SlowDirectory};
