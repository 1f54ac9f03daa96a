use hyper::HeaderMap;
use hyper::header::{HeaderName, HeaderValue};

use super::keystone::AccessInfo;
use crate::command::server::error::Error;

static X_IDENTITY_STATUS: HeaderName = HeaderName::from_static("x-identity-status");
static X_PROJECT_ID: HeaderName = HeaderName::from_static("x-project-id");
static X_PROJECT_NAME: HeaderName = HeaderName::from_static("x-project-name");
static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
static X_USER_NAME: HeaderName = HeaderName::from_static("x-user-name");
static X_ROLES: HeaderName = HeaderName::from_static("x-roles");
static X_SERVICE_CATALOG: HeaderName = HeaderName::from_static("x-service-catalog");
static X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");
static X_AUTH_URL: HeaderName = HeaderName::from_static("x-auth-url");
// Deprecated names, still read by older services.
static X_USER: HeaderName = HeaderName::from_static("x-user");
static X_TENANT_ID: HeaderName = HeaderName::from_static("x-tenant-id");
static X_TENANT_NAME: HeaderName = HeaderName::from_static("x-tenant-name");
static X_TENANT: HeaderName = HeaderName::from_static("x-tenant");
static X_ROLE: HeaderName = HeaderName::from_static("x-role");

/// Set on every request authenticated by this service, whichever scheme the identity
/// service finally accepted.
pub static X_AUTH_SECRET_KEY: HeaderName = HeaderName::from_static("x-auth-secret-key");
pub static X_AUTH_SECRET_KEY_VALUE: &str = "Yes";

/// Every header name this service owns on a forwarded request. Client values under these
/// names never reach the downstream service, even when no value is set for them.
static OWNED_HEADERS: [&HeaderName; 15] = [
    &X_IDENTITY_STATUS,
    &X_PROJECT_ID,
    &X_PROJECT_NAME,
    &X_USER_ID,
    &X_USER_NAME,
    &X_ROLES,
    &X_SERVICE_CATALOG,
    &X_AUTH_TOKEN,
    &X_AUTH_URL,
    &X_USER,
    &X_TENANT_ID,
    &X_TENANT_NAME,
    &X_TENANT,
    &X_ROLE,
    &X_AUTH_SECRET_KEY,
];

/// Identity context handed to the downstream service.
#[derive(Debug)]
pub struct IdentityHeaders(HeaderMap);

fn build_header_value(value: &str) -> Result<HeaderValue, Error> {
    match HeaderValue::from_str(value) {
        Ok(hv) => Ok(hv),
        Err(e) => {
            let msg = format!("Invalid identity header value: {e}");
            Err(Error::Execution(msg))
        }
    }
}

impl IdentityHeaders {
    pub fn from_access(access: &AccessInfo, auth_url: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();

        let roles = build_header_value(&access.role_names())?;
        let user_name = build_header_value(&access.user.name)?;

        let Ok(service_catalog) = serde_json::to_string(&access.service_catalog) else {
            let msg = "Failed to serialize service catalog".to_string();
            return Err(Error::Execution(msg));
        };

        headers.insert(X_IDENTITY_STATUS.clone(), HeaderValue::from_static("Confirmed"));
        headers.insert(X_USER_ID.clone(), build_header_value(&access.user.id)?);
        headers.insert(X_USER_NAME.clone(), user_name.clone());
        headers.insert(X_USER.clone(), user_name);
        headers.insert(X_ROLES.clone(), roles.clone());
        headers.insert(X_ROLE.clone(), roles);
        headers.insert(X_SERVICE_CATALOG.clone(), build_header_value(&service_catalog)?);
        let mut token = build_header_value(access.token.id.expose())?;
        token.set_sensitive(true);
        headers.insert(X_AUTH_TOKEN.clone(), token);
        headers.insert(X_AUTH_URL.clone(), build_header_value(auth_url)?);

        if let Some(tenant) = &access.token.tenant {
            let tenant_id = build_header_value(&tenant.id)?;
            let tenant_name = build_header_value(&tenant.name)?;

            headers.insert(X_PROJECT_ID.clone(), tenant_id.clone());
            headers.insert(X_TENANT_ID.clone(), tenant_id);
            headers.insert(X_PROJECT_NAME.clone(), tenant_name.clone());
            headers.insert(X_TENANT_NAME.clone(), tenant_name.clone());
            headers.insert(X_TENANT.clone(), tenant_name);
        }

        headers.insert(
            X_AUTH_SECRET_KEY.clone(),
            HeaderValue::from_static(X_AUTH_SECRET_KEY_VALUE),
        );

        Ok(Self(headers))
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|value| value.to_str().ok())
    }

    /// Merge into `headers`. Client values under any owned name are dropped first.
    pub fn apply(self, headers: &mut HeaderMap) {
        for name in OWNED_HEADERS {
            headers.remove(name);
        }

        for (name, value) in self.0 {
            if let Some(name) = name {
                headers.insert(name, value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.0.iter()
    }
}
