//! User service
//!
//! Registration, token login/logout, password changes and avatars.

use std::sync::Arc;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{
    CreateUserInput, ListParams, PagedResult, Session, User, EMAIL_MAX_LEN, PASSWORD_MIN_LEN,
    PERSON_NAME_MAX_LEN, USERNAME_MAX_LEN,
};
use crate::services::media::{MediaError, MediaStorage, AVATARS_FOLDER};
use crate::services::password::{hash_password, verify_password};
use crate::services::validation::{check_text, FieldErrors};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid input, keyed by field
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Email or username already taken
    #[error("{0}")]
    Conflict(String),

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for UserServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    media: Arc<MediaStorage>,
    token_ttl_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        media: Arc<MediaStorage>,
        token_ttl_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            media,
            token_ttl_days,
        }
    }

    /// Register a new account
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_registration(&input)?;

        if self
            .user_repo
            .exists_by_email_or_username(&input.email, &input.username)
            .await?
        {
            tracing::debug!("Registration conflict for {}", input.username);
            return Err(UserServiceError::Conflict(
                "A user with this email or username already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(
            input.email,
            input.username,
            input.first_name,
            input.last_name,
            password_hash,
        );

        match self.user_repo.create(&user).await {
            Ok(user) => {
                tracing::info!("Registered user {} (id {})", user.username, user.id);
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::Conflict(
                "A user with this email or username already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Exchange credentials for an auth token
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, UserServiceError> {
        let invalid = || {
            UserServiceError::Validation(FieldErrors::single(
                "non_field_errors",
                "Unable to log in with provided credentials.",
            ))
        };

        let user = self.user_repo.get_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        let session = Session::issue(user.id, self.token_ttl_days);
        self.session_repo.create(&session).await?;

        tracing::info!("User {} logged in", user.id);
        Ok(session)
    }

    /// Revoke a token
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a token to its user. Unknown and expired tokens yield `None`.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self.session_repo.get_by_id(token).await? else {
            return Ok(None);
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {}", e);
            }
            return Ok(None);
        }

        Ok(self.user_repo.get_by_id(session.user_id).await?)
    }

    pub async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::NotFound(id))
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self.user_repo.list(params).await?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Change the password after checking the current one
    pub async fn set_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        if !verify_password(current_password, &user.password_hash)? {
            return Err(FieldErrors::single("current_password", "Invalid password.").into());
        }

        let mut errors = FieldErrors::new();
        check_password(&mut errors, "new_password", new_password);
        errors.into_result()?;

        let hash = hash_password(new_password)?;
        self.user_repo.update_password(user.id, &hash).await?;

        tracing::info!("User {} changed password", user.id);
        Ok(())
    }

    /// Store a new avatar and drop the previous file. Returns the new path.
    pub async fn set_avatar(&self, user: &User, data_uri: &str) -> Result<String, UserServiceError> {
        let path = self
            .media
            .save_data_uri(AVATARS_FOLDER, data_uri)
            .await
            .map_err(|e| media_error::<UserServiceError>("avatar", e))?;

        if let Err(e) = self.user_repo.update_avatar(user.id, Some(&path)).await {
            self.media.discard(&path).await;
            return Err(e.into());
        }

        if let Some(old) = &user.avatar {
            self.media.discard(old).await;
        }
        Ok(path)
    }

    /// Remove the avatar file and clear the reference
    pub async fn clear_avatar(&self, user: &User) -> Result<(), UserServiceError> {
        self.user_repo.update_avatar(user.id, None).await?;
        if let Some(old) = &user.avatar {
            self.media.discard(old).await;
        }
        Ok(())
    }
}

/// Map a media failure onto `field`. Storage failures are internal errors.
pub(crate) fn media_error<E>(field: &str, err: MediaError) -> E
where
    E: From<FieldErrors> + From<anyhow::Error>,
{
    match err {
        MediaError::Io(e) => anyhow::Error::from(e).context("Failed to store image").into(),
        other => FieldErrors::single(field, other.to_string()).into(),
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str) {
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LEN
            ),
        );
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn validate_registration(input: &CreateUserInput) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    check_text(&mut errors, "email", &input.email, EMAIL_MAX_LEN);
    if !errors.contains("email") && !is_valid_email(&input.email) {
        errors.add("email", "Enter a valid email address.");
    }

    check_text(&mut errors, "username", &input.username, USERNAME_MAX_LEN);
    if !errors.contains("username") && !USERNAME_RE.is_match(&input.username) {
        errors.add(
            "username",
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    check_text(&mut errors, "first_name", &input.first_name, PERSON_NAME_MAX_LEN);
    check_text(&mut errors, "last_name", &input.last_name, PERSON_NAME_MAX_LEN);
    check_password(&mut errors, "password", &input.password);

    errors.into_result()
}
