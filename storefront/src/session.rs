//! Login/signup gate.
//!
//! Login and signup share one fence, so only the most recent attempt can
//! sign a user in. Logout also advances the fence, which drops any attempt
//! still in flight.

use crate::error::ServiceError;
use crate::services::{AuthService, with_timeout};
use crate::types::{AuthSession, AuthToken, RequestFence, RequestId, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storefront_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Who is signed in
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Signed-in user
    pub user: Option<User>,
    /// Their credential
    pub token: Option<AuthToken>,
    /// An attempt is in flight
    pub loading: bool,
    /// Last failure
    pub error: Option<ServiceError>,
    /// Fence for login/signup attempts
    pub fence: RequestFence,
}

impl SessionState {
    /// True exactly when a user is present
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    fn sign_in(&mut self, session: AuthSession) {
        self.loading = false;
        self.error = None;
        self.user = Some(session.user);
        self.token = Some(session.token);
    }
}

/// Session commands and request lifecycle events
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    // Commands
    /// Sign in
    Login {
        /// Email address
        email: String,
        /// Password
        password: String,
    },
    /// Create an account and sign in
    Signup {
        /// Email address
        email: String,
        /// Password
        password: String,
        /// Display name
        name: String,
        /// Optional phone
        phone: Option<String>,
    },
    /// Sign out; local state is cleared immediately
    Logout,

    // Lifecycle events
    /// A login was issued
    LoginRequest,
    /// A login succeeded
    LoginSuccess {
        /// Which attempt
        request: RequestId,
        /// User and token
        session: AuthSession,
    },
    /// A login failed
    LoginFailure {
        /// Which attempt
        request: RequestId,
        /// Why
        error: ServiceError,
    },
    /// A signup was issued
    SignupRequest,
    /// A signup succeeded
    SignupSuccess {
        /// Which attempt
        request: RequestId,
        /// User and token
        session: AuthSession,
    },
    /// A signup failed
    SignupFailure {
        /// Which attempt
        request: RequestId,
        /// Why
        error: ServiceError,
    },
}

impl SessionAction {
    /// True when this action resolves attempt `request`
    #[must_use]
    pub fn resolves(&self, request: RequestId) -> bool {
        match self {
            Self::LoginSuccess { request: r, .. }
            | Self::LoginFailure { request: r, .. }
            | Self::SignupSuccess { request: r, .. }
            | Self::SignupFailure { request: r, .. } => *r == request,
            _ => false,
        }
    }
}

/// Dependencies of the session reducer
#[derive(Clone)]
pub struct SessionEnvironment {
    /// Auth collaborator
    pub auth: Arc<dyn AuthService>,
    /// Upper bound for each collaborator call
    pub request_timeout: Duration,
}

/// Reducer for [`SessionState`]
#[derive(Clone, Debug, Default)]
pub struct SessionReducer;

impl SessionReducer {
    /// Creates a new `SessionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn begin(state: &mut SessionState) -> RequestId {
        state.loading = true;
        state.error = None;
        state.fence.issue()
    }

    fn fail(state: &mut SessionState, request: RequestId, error: ServiceError) {
        if state.fence.is_current(request) {
            tracing::warn!(%error, "Authentication failed");
            state.loading = false;
            state.error = Some(error);
        } else {
            tracing::debug!(%request, "Discarding stale auth resolution");
        }
    }

    fn succeed(state: &mut SessionState, request: RequestId, session: AuthSession) {
        if state.fence.is_current(request) {
            tracing::info!(user_id = %session.user.id, "Signed in");
            state.sign_in(session);
        } else {
            tracing::debug!(%request, "Discarding stale auth resolution");
        }
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SessionAction::Login { email, password } => {
                let request = Self::begin(state);
                let auth = Arc::clone(&env.auth);
                let timeout = env.request_timeout;
                smallvec![Effect::future(async move {
                    match with_timeout(timeout, auth.login(email, password)).await {
                        Ok(session) => SessionAction::LoginSuccess { request, session },
                        Err(error) => SessionAction::LoginFailure { request, error },
                    }
                })]
            },
            SessionAction::Signup {
                email,
                password,
                name,
                phone,
            } => {
                let request = Self::begin(state);
                let auth = Arc::clone(&env.auth);
                let timeout = env.request_timeout;
                smallvec![Effect::future(async move {
                    match with_timeout(timeout, auth.signup(email, password, name, phone)).await {
                        Ok(session) => SessionAction::SignupSuccess { request, session },
                        Err(error) => SessionAction::SignupFailure { request, error },
                    }
                })]
            },
            SessionAction::Logout => {
                let fence = state.fence;
                *state = SessionState {
                    fence,
                    ..SessionState::default()
                };
                state.fence.issue();
                tracing::info!("Signed out");

                let auth = Arc::clone(&env.auth);
                let timeout = env.request_timeout;
                smallvec![Effect::Future(Box::pin(async move {
                    if let Err(error) = with_timeout(timeout, auth.logout()).await {
                        tracing::warn!(%error, "Backend logout failed");
                    }
                    None
                }))]
            },
            SessionAction::LoginRequest | SessionAction::SignupRequest => {
                Self::begin(state);
                SmallVec::new()
            },
            SessionAction::LoginSuccess { request, session }
            | SessionAction::SignupSuccess { request, session } => {
                Self::succeed(state, request, session);
                SmallVec::new()
            },
            SessionAction::LoginFailure { request, error }
            | SessionAction::SignupFailure { request, error } => {
                Self::fail(state, request, error);
                SmallVec::new()
            },
        }
    }
}
