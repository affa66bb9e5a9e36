pub mod claims;
pub mod clock;
pub mod error;
pub mod factory;
pub mod jwt;
pub mod token_service;

pub use claims::{Claims, Principal};
pub use error::TokenError;
pub use factory::build_token_service;
pub use token_service::{TokenService, TokenSettings};
