//! Data structures shared by the registry services.

pub mod address;
pub mod certificate;
pub mod diploma;
