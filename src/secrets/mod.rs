mod token_store;

pub use token_store::{TokenStore, TOKEN_ENV};
