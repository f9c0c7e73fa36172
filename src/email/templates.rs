use askama::Template;

#[derive(Template)]
#[template(path = "emails/welcome.html")]
pub struct WelcomeEmail<'a> {
    pub name: &'a str,
    pub login_url: &'a str,
}

impl WelcomeEmail<'_> {
    pub fn render_html(&self) -> Result<String, String> {
        self.render().map_err(|e| format!("Failed to render welcome email: {e}"))
    }
}

pub struct InvitationEmail<'a> {
    pub sender_name: &'a str,
    pub organization_name: &'a str,
    pub role: &'a str,
    pub login_url: &'a str,
}

#[derive(Template)]
#[template(path = "emails/invitation.html")]
struct InvitationHtml<'a> {
    invite: &'a InvitationEmail<'a>,
}

#[derive(Template)]
#[template(path = "emails/invitation.txt")]
struct InvitationText<'a> {
    invite: &'a InvitationEmail<'a>,
}

impl<'a> InvitationEmail<'a> {
    pub fn render_html(&self) -> Result<String, String> {
        InvitationHtml { invite: self }
            .render()
            .map_err(|e| format!("Failed to render invitation email: {e}"))
    }

    pub fn render_text(&self) -> Result<String, String> {
        InvitationText { invite: self }
            .render()
            .map_err(|e| format!("Failed to render invitation email: {e}"))
    }
}

/// Context for the password reset email. `uid` and `token` are what the
/// frontend's confirm page posts back.
#[derive(Template)]
#[template(path = "emails/password_reset.html")]
pub struct PasswordResetEmail<'a> {
    pub name: &'a str,
    pub uid: &'a str,
    pub token: &'a str,
    pub reset_url: &'a str,
}

impl PasswordResetEmail<'_> {
    pub fn render_html(&self) -> Result<String, String> {
        self.render()
            .map_err(|e| format!("Failed to render password reset email: {e}"))
    }
}
