mod department;
mod organization;
mod password_reset_token;
mod profile;
mod refresh_token;
mod social_account;
mod user;

pub use department::Department;
pub use organization::{Organization, OrganizationType};
pub use password_reset_token::PasswordResetToken;
pub use profile::{Role, StaffMemberRow, UserProfile};
pub use refresh_token::RefreshToken;
pub use social_account::SocialAccount;
pub use user::{display_name, User};
