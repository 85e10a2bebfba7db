pub mod password;
pub mod service;
pub mod token;

pub use password::{PasswordError, PasswordHasher};
pub use service::{AuthError, Authenticator, UserIdentity};
pub use token::{Claims, Token, TokenCodec, TokenError};
