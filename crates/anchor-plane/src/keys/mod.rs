//! Key material the plane trusts

mod admins;

pub use admins::AdminSet;
