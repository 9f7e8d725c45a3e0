//! Shared fixtures: users, scripted collaborators and a ready-made context.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::net::api::{ApiError, AuthApi, TaskApi};
use crate::net::types::{AuthMethod, Role, Task, TaskStatus, User};
use crate::services::analytics::Analytics;
use crate::services::session::AuthContext;
use crate::services::storage::MemorySessionStorage;
use crate::state::auth::AuthStore;

#[must_use]
pub fn user(id: &str, role: Role) -> User {
    User { id: id.into(), name: format!("user-{id}"), email: Some(format!("{id}@example.com")), avatar_url: None, role }
}

#[must_use]
pub fn task(id: &str, status: TaskStatus) -> Task {
    Task { id: id.into(), status, result: None, error: None }
}

// =============================================================================
// MockAuthApi
// =============================================================================

/// Replies to login calls with `login_result`; logout fails when `logout_fails`.
pub struct MockAuthApi {
    pub login_result: Mutex<Option<Result<User, ApiError>>>,
    pub logout_fails: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockAuthApi {
    #[must_use]
    pub fn accepting(user: User) -> Self {
        Self { login_result: Mutex::new(Some(Ok(user))), logout_fails: false, calls: Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn rejecting() -> Self {
        Self {
            login_result: Mutex::new(Some(Err(ApiError::Unauthorized))),
            logout_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_failing_logout(mut self) -> Self {
        self.logout_fails = true;
        self
    }

    fn next_login(&self) -> Result<User, ApiError> {
        self.login_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(ApiError::ApiRequest("no scripted login".into())))
    }
}

#[async_trait::async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, email: &str, _password: &str) -> Result<User, ApiError> {
        self.calls.lock().unwrap().push(format!("login:{email}"));
        self.next_login()
    }

    async fn google_sign_in(&self, access_token: &str) -> Result<User, ApiError> {
        self.calls.lock().unwrap().push(format!("google:{access_token}"));
        self.next_login()
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push("logout".into());
        if self.logout_fails {
            Err(ApiError::ApiRequest("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// ScriptedTaskApi
// =============================================================================

/// Replays scripted task responses; repeats the last one when exhausted.
pub struct ScriptedTaskApi {
    responses: Mutex<VecDeque<Result<Task, ApiError>>>,
    last: Mutex<Option<Task>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedTaskApi {
    #[must_use]
    pub fn new(responses: Vec<Result<Task, ApiError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), last: Mutex::new(None), calls: Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl TaskApi for ScriptedTaskApi {
    async fn task_status(&self, task_id: &str) -> Result<Task, ApiError> {
        self.calls.lock().unwrap().push(task_id.to_owned());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(task)) => {
                *self.last.lock().unwrap() = Some(task.clone());
                Ok(task)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ApiError::ApiRequest("no scripted response".into())),
        }
    }
}

// =============================================================================
// RecordingAnalytics
// =============================================================================

#[derive(Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<String>>,
}

impl RecordingAnalytics {
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Analytics for RecordingAnalytics {
    fn identify(&self, user_id: &str) {
        self.events.lock().unwrap().push(format!("identify:{user_id}"));
    }

    fn reset(&self) {
        self.events.lock().unwrap().push("reset".into());
    }

    fn track_auth_login(&self, method: AuthMethod, success: bool, error: Option<&str>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("login:{method}:{success}:{}", error.unwrap_or("-")));
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

pub struct TestContext {
    pub context: AuthContext,
    pub storage: Arc<MemorySessionStorage>,
    pub api: Arc<MockAuthApi>,
    pub analytics: Arc<RecordingAnalytics>,
}

/// A fresh context over in-memory storage and the given mock API.
#[must_use]
pub fn test_context(api: MockAuthApi) -> TestContext {
    let storage = Arc::new(MemorySessionStorage::new());
    let api = Arc::new(api);
    let analytics = Arc::new(RecordingAnalytics::default());
    let context = AuthContext::new(AuthStore::new(), storage.clone(), api.clone(), analytics.clone());
    TestContext { context, storage, api, analytics }
}
