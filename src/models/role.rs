use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::AppError;

/// Role
///
/// The closed set of roles. This single enum is used by the user record, the token,
/// every Role Guard and the notification audience matcher, so the schema and the
/// authorization logic cannot drift apart.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
    Moderator,
    ContentManager,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Admin, Role::Moderator, Role::ContentManager];

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::ContentManager => "content-manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.code() == code)
            .ok_or_else(|| {
                AppError::validation(
                    "Invalid role. Must be one of: user, admin, moderator, content-manager",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_codes_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.code().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Role::ContentManager).unwrap();
        assert_eq!(json, r#""content-manager""#);
    }

    #[test]
    fn test_unknown_role_is_validation_error() {
        assert!(matches!("owner".parse::<Role>(), Err(AppError::Validation(_))));
    }
}
