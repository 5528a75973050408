//! Access policy. Decides, per request, whether the caller may proceed.
//!
//! The policy is a pure function of the requested path and the caller's
//! state. It never performs I/O: the caller resolves the session, asks
//! [`AccessPolicy::needs_profile`] whether a profile lookup is required, and
//! passes the outcome to [`AccessPolicy::decide`].
//!
//! Rules, first match wins:
//!
//! 1. Static / internal paths pass through.
//! 2. Protected paths without a session redirect to the landing page.
//! 3. `/` with a session redirects to onboarding or the dashboard.
//! 4. Public paths pass through.
//! 5. Remaining authenticated requests consult the profile:
//!    lookup failure allows (fail open), an incomplete profile on a
//!    protected path redirects to onboarding with `redirect_from`, a complete
//!    profile on the onboarding path redirects to the dashboard.

use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use url::form_urlencoded;

/// Query parameter carrying the originally requested path to onboarding.
pub const REDIRECT_FROM_PARAM: &str = "redirect_from";

// ─── Inputs and outputs ──────────────────────────────────────────────────────

/// What is known about the caller's onboarding when the policy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
  /// A profile exists.
  Complete,
  /// The lookup succeeded and found no profile.
  Incomplete,
  /// The lookup itself failed.
  LookupFailed,
  /// No lookup was performed because [`AccessPolicy::needs_profile`] said
  /// it was unnecessary.
  Unchecked,
}

/// The caller as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
  Anonymous,
  Authenticated(ProfileStatus),
}

/// Outcome of a policy evaluation. The caller performs the navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Redirect(String),
}

/// Path category, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PathClass {
  Static,
  Protected,
  Root,
  Public,
  Onboarding,
  Other,
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Path tables driving the access decision.
///
/// `protected_prefixes` and `onboarding_prefixes` match a path equal to the
/// prefix or continuing with `/`; `public_paths` match exactly;
/// `static_prefixes` match as plain string prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
  pub static_prefixes:     Vec<String>,
  pub public_paths:        Vec<String>,
  pub onboarding_prefixes: Vec<String>,
  pub protected_prefixes:  Vec<String>,
  pub landing_path:        String,
  pub onboarding_path:     String,
  pub dashboard_path:      String,
}

fn strings(items: &[&str]) -> Vec<String> { items.iter().map(|s| (*s).to_owned()).collect() }

impl Default for AccessPolicy {
  fn default() -> Self {
    Self {
      static_prefixes:     strings(&["/_next", "/api", "/static"]),
      public_paths:        strings(&[
        "/",
        "/login",
        "/sign-up",
        "/auth/callback",
        "/forgot-password",
        "/terms",
        "/privacy",
        "/contact",
      ]),
      onboarding_prefixes: strings(&["/questionnaire"]),
      protected_prefixes:  strings(&["/dashboard", "/profile", "/settings", "/trials"]),
      landing_path:        "/".to_owned(),
      onboarding_path:     "/questionnaire".to_owned(),
      dashboard_path:      "/dashboard".to_owned(),
    }
  }
}

fn under(path: &str, prefix: &str) -> bool {
  match path.strip_prefix(prefix) {
    Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
    None       => false,
  }
}

impl AccessPolicy {
  /// Classify `path`. Static wins over everything; a path containing a `.`
  /// anywhere is treated as an asset.
  pub fn classify(&self, path: &str) -> PathClass {
    if path.contains('.') || self.static_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
      return PathClass::Static;
    }
    if self.is_protected(path) {
      return PathClass::Protected;
    }
    if path == self.landing_path {
      return PathClass::Root;
    }
    if self.public_paths.iter().any(|p| p == path) {
      return PathClass::Public;
    }
    if self.is_onboarding(path) {
      return PathClass::Onboarding;
    }
    PathClass::Other
  }

  pub fn is_protected(&self, path: &str) -> bool {
    self.protected_prefixes.iter().any(|p| under(path, p))
  }

  pub fn is_onboarding(&self, path: &str) -> bool {
    self.onboarding_prefixes.iter().any(|p| under(path, p))
  }

  /// Whether [`decide`](Self::decide) needs a profile lookup for an
  /// authenticated caller requesting `path`.
  pub fn needs_profile(&self, path: &str) -> bool {
    !matches!(self.classify(path), PathClass::Static | PathClass::Public)
  }

  /// Evaluate the policy.
  ///
  /// An authenticated caller whose status is [`ProfileStatus::Unchecked`] on
  /// a path that [`needs_profile`](Self::needs_profile) is treated like a
  /// failed lookup: allowed through.
  pub fn decide(&self, path: &str, caller: Caller) -> Decision {
    let class = self.classify(path);

    let status = match (class, caller) {
      (PathClass::Static, _)                 => return Decision::Allow,
      (PathClass::Protected, Caller::Anonymous) => {
        return Decision::Redirect(self.landing_path.clone());
      }
      (_, Caller::Anonymous)                 => return Decision::Allow,
      (_, Caller::Authenticated(status))     => status,
    };

    match (class, status) {
      (PathClass::Root, ProfileStatus::Incomplete) => {
        Decision::Redirect(self.onboarding_path.clone())
      }
      (PathClass::Root, _)                         => {
        Decision::Redirect(self.dashboard_path.clone())
      }
      (PathClass::Public, _)                       => Decision::Allow,
      (_, ProfileStatus::LookupFailed | ProfileStatus::Unchecked) => Decision::Allow,
      (PathClass::Protected, ProfileStatus::Incomplete) => {
        Decision::Redirect(self.onboarding_redirect(path))
      }
      (PathClass::Onboarding, ProfileStatus::Complete) => {
        Decision::Redirect(self.dashboard_path.clone())
      }
      _ => Decision::Allow,
    }
  }

  /// `/questionnaire?redirect_from=<path>` with `path` form-encoded.
  pub fn onboarding_redirect(&self, from: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
      .append_pair(REDIRECT_FROM_PARAM, from)
      .finish();
    format!("{}?{query}", self.onboarding_path)
  }

  /// `target` if it is a same-origin path, otherwise the dashboard.
  pub fn local_redirect(&self, target: Option<&str>) -> String {
    match target {
      Some(t) if is_local_path(t) => t.to_owned(),
      _                           => self.dashboard_path.clone(),
    }
  }
}

/// A path on this origin: leading `/`, not protocol-relative, no backslashes
/// or control characters.
pub fn is_local_path(target: &str) -> bool {
  target.starts_with('/')
    && !target.starts_with("//")
    && !target.contains('\\')
    && !target.chars().any(char::is_control)
}
