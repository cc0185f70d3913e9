use std::sync::Arc;

use crate::application::admin::AdminService;
use crate::application::auth::AuthService;
use crate::application::posts::PostService;

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub posts: Arc<PostService>,
    pub admin: Arc<AdminService>,
}
