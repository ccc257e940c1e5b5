#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod files;
mod git;

pub use files::*;
pub use git::*;
