use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::secret::Secret;

/// Token document returned by `POST /tokens`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access: Option<AccessInfo>,
}

/// The issued token with the user, tenant and service catalog it was scoped to.
#[derive(Clone, Debug, Deserialize)]
pub struct AccessInfo {
    pub token: Token,
    pub user: User,
    #[serde(rename = "serviceCatalog", default)]
    pub service_catalog: Vec<Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Token {
    pub id: Secret<String>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tenant: Option<Tenant>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Role {
    pub name: String,
}

/// Error document the identity service sends along with 4xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

impl Token {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

impl AccessInfo {
    pub fn role_names(&self) -> String {
        self.user
            .roles
            .iter()
            .map(|role| role.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub static ACCESS_DOCUMENT: &str = r#"{
        "access": {
            "token": {
                "id": "ab48a9efdfedb23ty3494",
                "expires": "2030-01-01T00:00:00Z",
                "tenant": { "id": "123", "name": "demo" }
            },
            "user": {
                "id": "u-1",
                "name": "AKIA123",
                "roles": [{ "name": "admin" }, { "name": "heat_stack_owner" }]
            },
            "serviceCatalog": [
                { "type": "orchestration", "name": "heat", "endpoints": [] }
            ]
        }
    }"#;

    #[test]
    fn test_deserialize_access_document() {
        let response: TokenResponse = serde_json::from_str(ACCESS_DOCUMENT).unwrap();
        let access = response.access.unwrap();

        assert_eq!(access.token.id.expose(), "ab48a9efdfedb23ty3494");
        assert_eq!(
            access.token.tenant,
            Some(Tenant {
                id: "123".to_string(),
                name: "demo".to_string()
            })
        );
        assert_eq!(
            access.token.expires.unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
        assert_eq!(access.user.id, "u-1");
        assert_eq!(access.role_names(), "admin,heat_stack_owner");
        assert_eq!(access.service_catalog.len(), 1);
    }

    #[test]
    fn test_token_id_is_redacted() {
        let response: TokenResponse = serde_json::from_str(ACCESS_DOCUMENT).unwrap();
        let debug_output = format!("{:?}", response.access.unwrap());
        assert!(!debug_output.contains("ab48a9efdfedb23ty3494"));
    }

    #[test]
    fn test_deserialize_without_access() {
        let response: TokenResponse = serde_json::from_str(r#"{"other": {}}"#).unwrap();
        assert!(response.access.is_none());
    }

    #[test]
    fn test_deserialize_unscoped_token() {
        let document = r#"{
            "access": {
                "token": { "id": "abc" },
                "user": { "id": "u-1", "name": "user" }
            }
        }"#;

        let response: TokenResponse = serde_json::from_str(document).unwrap();
        let access = response.access.unwrap();
        assert!(access.token.tenant.is_none());
        assert!(access.token.expires.is_none());
        assert_eq!(access.role_names(), "");
        assert!(access.service_catalog.is_empty());
    }

    #[test]
    fn test_token_expiry() {
        let response: TokenResponse = serde_json::from_str(ACCESS_DOCUMENT).unwrap();
        let token = response.access.unwrap().token;

        let before: DateTime<Utc> = "2029-12-31T23:59:59Z".parse().unwrap();
        let after: DateTime<Utc> = "2030-01-01T00:00:00Z".parse().unwrap();
        assert!(!token.is_expired(before));
        assert!(token.is_expired(after));

        let unscoped = Token {
            expires: None,
            ..token
        };
        assert!(!unscoped.is_expired(after));
    }

    #[test]
    fn test_deserialize_error_document() {
        let document = r#"{
            "error": {
                "message": "The request you have made requires authentication.",
                "code": 401,
                "title": "Unauthorized"
            }
        }"#;

        let response: ErrorResponse = serde_json::from_str(document).unwrap();
        assert_eq!(
            response.error.message,
            "The request you have made requires authentication."
        );
    }
}
