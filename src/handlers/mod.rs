pub mod ags;
pub mod health;
pub mod lti;
pub mod well_known;
