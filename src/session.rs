/// Session transport
///
/// Carries a token pair between client and server in two http-only cookies.
/// Tokens are opaque here; verification belongs to the token service.
use crate::{
    config::SessionConfig,
    error::{ApiError, ApiResult},
    token::TokenPair,
};
use axum::http::HeaderMap;
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

#[derive(Debug, Clone)]
pub struct SessionTransport {
    secure: bool,
    same_site: SameSite,
}

impl SessionTransport {
    pub fn new(config: &SessionConfig) -> ApiResult<Self> {
        Ok(Self {
            secure: config.secure_cookies,
            same_site: parse_same_site(&config.same_site)?,
        })
    }

    fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path("/")
            .build()
    }

    /// Set both cookies for a freshly issued or rotated pair
    pub fn attach(&self, jar: CookieJar, pair: &TokenPair) -> CookieJar {
        jar.add(self.cookie(ACCESS_COOKIE_NAME, pair.access_token.clone()))
            .add(self.cookie(REFRESH_COOKIE_NAME, pair.refresh_token.clone()))
    }

    /// Expire both cookies, whether or not the request carried them
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut access = self.cookie(ACCESS_COOKIE_NAME, String::new());
        access.make_removal();
        let mut refresh = self.cookie(REFRESH_COOKIE_NAME, String::new());
        refresh.make_removal();

        jar.add(access).add(refresh)
    }

    /// Access token from the cookie, else from an `Authorization: Bearer` header
    pub fn access_token(&self, headers: &HeaderMap) -> Option<String> {
        let jar = CookieJar::from_headers(headers);

        jar.get(ACCESS_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| extract_bearer_token(headers))
    }

    /// Refresh token from the cookie, else from the request body field
    pub fn refresh_token(&self, jar: &CookieJar, body_token: Option<&str>) -> Option<String> {
        jar.get(REFRESH_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| {
                body_token
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
            })
    }
}

/// Parse a SameSite policy name, case-insensitively
pub fn parse_same_site(value: &str) -> ApiResult<SameSite> {
    match value.trim().to_lowercase().as_str() {
        "strict" => Ok(SameSite::Strict),
        "lax" => Ok(SameSite::Lax),
        "none" => Ok(SameSite::None),
        other => Err(ApiError::Validation(format!(
            "Unsupported SameSite policy: {}",
            other
        ))),
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, response::IntoResponse};

    fn transport() -> SessionTransport {
        SessionTransport::new(&SessionConfig {
            secure_cookies: true,
            same_site: "strict".to_string(),
        })
        .unwrap()
    }

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "access-abc".to_string(),
            refresh_token: "refresh-xyz".to_string(),
        }
    }

    fn set_cookie_headers(jar: CookieJar) -> Vec<String> {
        jar.into_response()
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_attach_sets_both_cookies() {
        let headers = set_cookie_headers(transport().attach(CookieJar::new(), &pair()));

        assert_eq!(headers.len(), 2);
        let access = headers
            .iter()
            .find(|h| h.starts_with("accessToken=access-abc"))
            .unwrap();
        let refresh = headers
            .iter()
            .find(|h| h.starts_with("refreshToken=refresh-xyz"))
            .unwrap();

        for cookie in [access, refresh] {
            assert!(cookie.contains("HttpOnly"));
            assert!(cookie.contains("Secure"));
            assert!(cookie.contains("SameSite=Strict"));
            assert!(cookie.contains("Path=/"));
        }
    }

    #[test]
    fn test_clear_expires_both_cookies() {
        let headers = set_cookie_headers(transport().clear(CookieJar::new()));

        assert_eq!(headers.len(), 2);
        assert!(headers.iter().any(|h| h.starts_with("accessToken=;")));
        assert!(headers.iter().any(|h| h.starts_with("refreshToken=;")));
        assert!(headers.iter().all(|h| h.contains("Max-Age=0")));
    }

    #[test]
    fn test_insecure_lax_for_local_development() {
        let transport = SessionTransport::new(&SessionConfig {
            secure_cookies: false,
            same_site: "Lax".to_string(),
        })
        .unwrap();

        let headers = set_cookie_headers(transport.attach(CookieJar::new(), &pair()));
        assert!(headers.iter().all(|h| !h.contains("Secure")));
        assert!(headers.iter().all(|h| h.contains("SameSite=Lax")));
    }

    #[test]
    fn test_unknown_same_site_rejected() {
        let result = SessionTransport::new(&SessionConfig {
            secure_cookies: true,
            same_site: "sometimes".to_string(),
        });
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_same_site_parsing_is_case_insensitive() {
        assert_eq!(parse_same_site("STRICT").unwrap(), SameSite::Strict);
        assert_eq!(parse_same_site(" lax ").unwrap(), SameSite::Lax);
        assert_eq!(parse_same_site("None").unwrap(), SameSite::None);
        assert!(parse_same_site("").is_err());
    }

    #[test]
    fn test_access_token_prefers_cookie_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "accessToken=from-cookie".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());

        assert_eq!(
            transport().access_token(&headers).as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_access_token_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(
            transport().access_token(&headers).as_deref(),
            Some("from-header")
        );

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(transport().access_token(&basic), None);
        assert_eq!(transport().access_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_refresh_token_falls_back_to_body() {
        let transport = transport();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "refreshToken=from-cookie".parse().unwrap());
        let jar = CookieJar::from_headers(&headers);

        assert_eq!(
            transport.refresh_token(&jar, Some("from-body")).as_deref(),
            Some("from-cookie")
        );
        assert_eq!(
            transport
                .refresh_token(&CookieJar::new(), Some("from-body"))
                .as_deref(),
            Some("from-body")
        );
        assert_eq!(transport.refresh_token(&CookieJar::new(), Some("  ")), None);
        assert_eq!(transport.refresh_token(&CookieJar::new(), None), None);
    }
}
