pub mod gradebook;
pub mod registration;
pub mod tenant;
pub mod user;

pub use gradebook::{GradableActivity, Submission};
pub use registration::{Registration, RegistrationStatus, ResourceLink};
pub use tenant::Tenant;
pub use user::User;
