//! The `hmh_session` cookie: reading it from requests and building the
//! `Set-Cookie` values that issue, refresh and clear it.

use axum::http::{HeaderMap, HeaderValue, header};
use thiserror::Error;

pub const COOKIE_NAME: &str = "hmh_session";

#[derive(Debug, Error)]
pub enum CookieError {
  #[error("Cookie header is not valid UTF-8")]
  NotUtf8,
}

/// The session token presented by the client, if any.
///
/// Every `Cookie` header is considered; the first non-empty `hmh_session`
/// value wins. A header that is not UTF-8 is an error, so the caller can
/// decide how to fail.
pub fn token_from_headers(headers: &HeaderMap) -> Result<Option<String>, CookieError> {
  for value in headers.get_all(header::COOKIE) {
    let raw = std::str::from_utf8(value.as_bytes()).map_err(|_| CookieError::NotUtf8)?;
    let found = raw
      .split(';')
      .filter_map(|pair| pair.trim().split_once('='))
      .find(|(name, value)| *name == COOKIE_NAME && !value.is_empty())
      .map(|(_, value)| value.trim_matches('"').to_owned());
    if found.is_some() {
      return Ok(found);
    }
  }
  Ok(None)
}

fn build(value: &str, max_age: i64, secure: bool) -> String {
  let mut cookie = format!("{COOKIE_NAME}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax");
  if secure {
    cookie.push_str("; Secure");
  }
  cookie
}

/// `Set-Cookie` value carrying `token` for `max_age` seconds. `None` if the
/// token cannot be carried in a header.
pub fn session_cookie(token: &str, max_age: i64, secure: bool) -> Option<HeaderValue> {
  HeaderValue::try_from(build(token, max_age, secure)).ok()
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(secure: bool) -> HeaderValue {
  if secure {
    HeaderValue::from_static("hmh_session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax; Secure")
  } else {
    HeaderValue::from_static("hmh_session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
  }
}

/// Whether a response already sets the session cookie.
pub fn sets_session_cookie(headers: &HeaderMap) -> bool {
  headers.get_all(header::SET_COOKIE).iter().any(|v| {
    v.as_bytes()
      .strip_prefix(COOKIE_NAME.as_bytes())
      .is_some_and(|rest| rest.starts_with(b"="))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn headers(cookies: &[&[u8]]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for c in cookies {
      map.append(header::COOKIE, HeaderValue::from_bytes(c).unwrap());
    }
    map
  }

  #[test]
  fn finds_token_among_other_cookies() {
    let h = headers(&[b"theme=dark; hmh_session=abc123; other=1"]);
    assert_eq!(token_from_headers(&h).unwrap().as_deref(), Some("abc123"));
  }

  #[test]
  fn searches_every_cookie_header() {
    let h = headers(&[b"theme=dark", b"hmh_session=xyz"]);
    assert_eq!(token_from_headers(&h).unwrap().as_deref(), Some("xyz"));
  }

  #[test]
  fn missing_or_empty_cookie_is_none() {
    assert_eq!(token_from_headers(&HeaderMap::new()).unwrap(), None);
    assert_eq!(token_from_headers(&headers(&[b"hmh_session="])).unwrap(), None);
    assert_eq!(token_from_headers(&headers(&[b"hmh_sessionx=1"])).unwrap(), None);
  }

  #[test]
  fn non_utf8_header_is_an_error() {
    let h = headers(&[b"hmh_session=\xff\xfe"]);
    assert!(token_from_headers(&h).is_err());
  }

  #[test]
  fn cookie_attributes() {
    let v = session_cookie("tok", 3600, false).unwrap();
    assert_eq!(v, "hmh_session=tok; Path=/; Max-Age=3600; HttpOnly; SameSite=Lax");
    let v = session_cookie("tok", 60, true).unwrap();
    assert!(v.to_str().unwrap().ends_with("; Secure"));
    assert!(clear_cookie(false).to_str().unwrap().contains("Max-Age=0"));
  }

  #[test]
  fn detects_session_set_cookie() {
    let mut h = HeaderMap::new();
    h.append(header::SET_COOKIE, HeaderValue::from_static("theme=dark"));
    assert!(!sets_session_cookie(&h));
    h.append(header::SET_COOKIE, clear_cookie(false));
    assert!(sets_session_cookie(&h));
  }
}
