use actix_session::Session;

use crate::errors::AppError;

/// Permission codes carried in the session, stored as a comma separated list.
#[derive(Debug, Clone, Default)]
pub struct Permissions(pub Vec<String>);

impl Permissions {
    pub fn has(&self, code: &str) -> bool {
        self.0.iter().any(|p| p == code)
    }

    pub fn from_csv(csv: &str) -> Self {
        let codes = csv
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Permissions(codes)
    }

    pub fn to_csv(&self) -> String {
        self.0.join(",")
    }
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>("user_id").unwrap_or(None)
}

/// Permissions of the session user; anonymous sessions have none.
pub fn get_permissions(session: &Session) -> Permissions {
    session
        .get::<String>("permissions")
        .unwrap_or(None)
        .map(|csv| Permissions::from_csv(&csv))
        .unwrap_or_default()
}

pub fn require_user_id(session: &Session) -> Result<i64, AppError> {
    get_user_id(session).ok_or_else(|| AppError::Session("Not authenticated".to_string()))
}

/// Store the logged-in user in the session.
pub fn sign_in(
    session: &Session,
    user_id: i64,
    username: &str,
    permissions: &Permissions,
) -> Result<(), AppError> {
    session.renew();
    session
        .insert("user_id", user_id)
        .and_then(|_| session.insert("username", username))
        .and_then(|_| session.insert("permissions", permissions.to_csv()))
        .map_err(|e| AppError::Session(format!("Failed to store session: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parsing_ignores_blanks_and_whitespace() {
        let perms = Permissions::from_csv(" event.manage_all, ,audit.view ");
        assert!(perms.has("event.manage_all"));
        assert!(perms.has("audit.view"));
        assert!(!perms.has(""));
        assert_eq!(perms.to_csv(), "event.manage_all,audit.view");
    }
}
