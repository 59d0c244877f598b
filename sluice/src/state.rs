//! # Request State Shapes
//!
//! Two unrelated types carry a request through the two pipelines:
//!
//! - [`PrivilegedState`] lives only inside the supervisor pipeline. It may hold
//!   secret material ([`SecretContext`], [`SecretKeyRef`]).
//! - [`SanitizedState`] is the only shape the customer pipeline accepts. It has
//!   no field that could hold a secret, a credential reference or an admin path,
//!   so a leak cannot be reintroduced by filling in an optional field.
//!
//! There is no shared base type and no `From` conversion between the two. The
//! single path from one to the other is [`crate::bridge::Bridge::project`].

use serde::Serialize;
use std::fmt;

/// Provenance tag of a [`PrivilegedState`], fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivilegedOrigin {
    /// No provenance recorded. Never valid for projection.
    #[default]
    Unset,
    /// Built by the admin entry point for a fresh operator request.
    AdminEntry,
    /// Claims to have come out of a projection hop. Privileged state never
    /// legitimately flows back out of the bridge, so this is refused too.
    Bridge,
}

impl PrivilegedOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivilegedOrigin::Unset => "unset",
            PrivilegedOrigin::AdminEntry => "admin-entry",
            PrivilegedOrigin::Bridge => "bridge",
        }
    }
}

impl fmt::Display for PrivilegedOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router decision. Written once per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Unset,
    RespondDirectly,
    Delegate,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Unset => "unset",
            Route::RespondDirectly => "respond-directly",
            Route::Delegate => "delegate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("route already decided as '{current}'")]
    RouteAlreadySet { current: Route },

    #[error("route cannot be reset to 'unset'")]
    UnsetRoute,

    #[error("a direct response requires route 'respond-directly', found '{route}'")]
    ResponseWithoutDirectRoute { route: Route },
}

/// Privileged material such as internal memo contents.
///
/// Not `Clone`, and `Debug` never prints the value.
pub struct SecretContext(String);

impl SecretContext {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value. Only the router's classifier call reads it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretContext(<redacted {} bytes>)", self.0.len())
    }
}

/// Opaque credential reference.
pub struct SecretKeyRef(String);

impl SecretKeyRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKeyRef(<redacted>)")
    }
}

/// Admin-only request state.
#[derive(Debug)]
pub struct PrivilegedState {
    origin: PrivilegedOrigin,
    admin_input: String,
    secret_context: Option<SecretContext>,
    secret_key_ref: Option<SecretKeyRef>,
    route: Route,
    response: Option<String>,
}

impl PrivilegedState {
    /// State for a fresh operator request entering through the admin mode.
    pub fn admin_entry(admin_input: impl Into<String>) -> Self {
        Self::with_origin(PrivilegedOrigin::AdminEntry, admin_input)
    }

    /// State carrying an arbitrary provenance tag.
    ///
    /// Only the admin entry point should produce `AdminEntry`; the bridge
    /// refuses anything else.
    pub fn with_origin(origin: PrivilegedOrigin, admin_input: impl Into<String>) -> Self {
        Self {
            origin,
            admin_input: admin_input.into(),
            secret_context: None,
            secret_key_ref: None,
            route: Route::Unset,
            response: None,
        }
    }

    pub fn with_secret_context(mut self, secret: SecretContext) -> Self {
        self.secret_context = Some(secret);
        self
    }

    pub fn with_secret_key_ref(mut self, key_ref: SecretKeyRef) -> Self {
        self.secret_key_ref = Some(key_ref);
        self
    }

    pub fn origin(&self) -> PrivilegedOrigin {
        self.origin
    }

    pub fn admin_input(&self) -> &str {
        &self.admin_input
    }

    pub fn secret_context(&self) -> Option<&SecretContext> {
        self.secret_context.as_ref()
    }

    pub fn secret_key_ref(&self) -> Option<&SecretKeyRef> {
        self.secret_key_ref.as_ref()
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    /// Record the router's decision. The route can be written exactly once.
    pub fn set_route(&mut self, route: Route) -> Result<(), StateError> {
        if route == Route::Unset {
            return Err(StateError::UnsetRoute);
        }
        if self.route != Route::Unset {
            return Err(StateError::RouteAlreadySet {
                current: self.route,
            });
        }
        self.route = route;
        Ok(())
    }

    pub(crate) fn set_response(&mut self, response: String) -> Result<(), StateError> {
        if self.route != Route::RespondDirectly {
            return Err(StateError::ResponseWithoutDirectRoute { route: self.route });
        }
        self.response = Some(response);
        Ok(())
    }
}

/// Provenance tag of a [`SanitizedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SanitizedOrigin {
    UserEntry,
    BridgeProjection,
}

impl fmt::Display for SanitizedOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizedOrigin::UserEntry => f.write_str("user-entry"),
            SanitizedOrigin::BridgeProjection => f.write_str("bridge-projection"),
        }
    }
}

/// Customer-safe request state.
///
/// `Serialize` exists so tests can walk every field of the produced value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedState {
    origin: SanitizedOrigin,
    input_text: String,
    response: Option<String>,
}

impl SanitizedState {
    /// State for a request entering through the user mode.
    pub fn user_entry(input_text: impl Into<String>) -> Self {
        Self {
            origin: SanitizedOrigin::UserEntry,
            input_text: input_text.into(),
            response: None,
        }
    }

    /// Only the bridge builds projected state.
    pub(crate) fn projected(input_text: String) -> Self {
        Self {
            origin: SanitizedOrigin::BridgeProjection,
            input_text,
            response: None,
        }
    }

    pub fn origin(&self) -> SanitizedOrigin {
        self.origin
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub(crate) fn set_response(&mut self, response: String) {
        self.response = Some(response);
    }
}
