#[cfg(test)]
use crate::features::auth::model::{AuthenticatedUser, Role};

#[cfg(test)]
use axum::{extract::Request, middleware::Next, Router};

#[cfg(test)]
use uuid::Uuid;

#[cfg(test)]
pub fn create_client_user() -> AuthenticatedUser {
    AuthenticatedUser::new(Uuid::new_v4(), Role::User)
}

#[cfg(test)]
pub fn create_moderator_user() -> AuthenticatedUser {
    AuthenticatedUser::new(Uuid::new_v4(), Role::Moderator)
}

/// Wrap a router so every request arrives as `user`, bypassing token checks
#[cfg(test)]
pub fn with_auth(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}
