pub mod audit;
pub mod departments;
pub mod organizations;
pub mod password_reset_tokens;
pub mod profiles;
pub mod refresh_tokens;
pub mod social_accounts;
pub mod users;
