pub mod assignments;

pub mod privacy;

pub use assignments::configure_assignment_routes;
pub use privacy::configure_privacy_routes;
