pub mod access;
pub mod error;
pub mod guards;

pub use access::AccessPipeline;
pub use error::AccessError;
pub use guards::parse_bearer;
