// Application state shared across all modules

use std::sync::Arc;
use std::time::Instant;

use crate::auth::service::LoginService;
use crate::auth::session::SessionIssuer;
use crate::storage::UserStore;

/// Application state containing the user store, services, and start time
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub login: LoginService,
    pub sessions: SessionIssuer,
    pub started_at: Instant,
}
