use std::sync::Arc;

use metrics::counter;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::forms::{
    FieldErrors, INVALID_LOGIN_MESSAGE, LoginFormInput, SignupFormInput, USERNAME_TAKEN_MESSAGE,
};
use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::{SessionRecord, UserRecord};

const PREFIX_LEN: usize = 12;
const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_SESSION_TTL_HOURS: u32 = 336;

/// Hashes and checks account passwords.
pub trait PasswordService: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(pub String);

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account form is invalid")]
    Invalid(FieldErrors),
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// The signed-in visitor, as handlers and templates see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

impl From<&UserRecord> for CurrentUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
        }
    }
}

/// A freshly opened session. `token` is only ever handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: CurrentUser,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    users_write: Arc<dyn UsersWriteRepo>,
    sessions: Arc<dyn SessionsRepo>,
    passwords: Arc<dyn PasswordService>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        users_write: Arc<dyn UsersWriteRepo>,
        sessions: Arc<dyn SessionsRepo>,
        passwords: Arc<dyn PasswordService>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            users_write,
            sessions,
            passwords,
            session_ttl,
        }
    }

    pub async fn signup(&self, input: &SignupFormInput) -> Result<UserRecord, AccountError> {
        let draft = input.validate().map_err(AccountError::Invalid)?;

        if self.users.find_by_username(&draft.username).await?.is_some() {
            return Err(username_taken());
        }

        let password_hash = self.passwords.hash(&draft.password)?;
        let user = match self
            .users_write
            .create_user(CreateUserParams {
                username: draft.username,
                first_name: draft.first_name,
                last_name: draft.last_name,
                email: draft.email,
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            // lost a race with a concurrent signup for the same name
            Err(RepoError::Duplicate { .. }) => return Err(username_taken()),
            Err(err) => return Err(err.into()),
        };

        counter!("yatube_users_registered_total").increment(1);
        info!(
            target = "yatube::accounts",
            user_id = user.id,
            username = %user.username,
            "user registered"
        );

        Ok(user)
    }

    /// Check credentials and open a session for the user.
    pub async fn login(&self, input: &LoginFormInput) -> Result<IssuedSession, AccountError> {
        input.validate().map_err(AccountError::Invalid)?;

        let Some(user) = self.users.find_by_username(input.username.trim()).await? else {
            return Err(invalid_login());
        };
        if !self.passwords.verify(&input.password, &user.password_hash)? {
            return Err(invalid_login());
        }

        let issued = self.start_session(&user).await?;
        info!(
            target = "yatube::accounts",
            user_id = user.id,
            "session opened"
        );

        // sweep sessions that expired without being presented again
        match self.purge_expired_sessions().await {
            Ok(0) => {}
            Ok(purged) => info!(target = "yatube::accounts", purged, "expired sessions purged"),
            Err(err) => warn!(
                target = "yatube::accounts",
                error = %err,
                "failed to purge expired sessions"
            ),
        }

        Ok(issued)
    }

    pub async fn start_session(&self, user: &UserRecord) -> Result<IssuedSession, AccountError> {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{prefix}_{secret}");
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;

        self.sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                prefix,
                secret_hash: hash_secret(&secret),
                expires_at,
            })
            .await?;

        Ok(IssuedSession {
            token,
            user: CurrentUser::from(user),
            expires_at,
        })
    }

    /// Resolve a session token to its user. Unknown, tampered and expired
    /// tokens all read as anonymous.
    pub async fn authenticate(&self, token: &str) -> Result<Option<CurrentUser>, AccountError> {
        let Some(session) = self.verified_session(token).await? else {
            return Ok(None);
        };

        if session.expires_at <= OffsetDateTime::now_utc() {
            self.sessions.delete_session(&session.prefix).await?;
            return Ok(None);
        }

        let user = self.users.find_by_id(session.user_id).await?;
        Ok(user.as_ref().map(CurrentUser::from))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        if let Some(session) = self.verified_session(token).await? {
            self.sessions.delete_session(&session.prefix).await?;
            info!(
                target = "yatube::accounts",
                user_id = session.user_id,
                "session closed"
            );
        }
        Ok(())
    }

    pub async fn delete_user(&self, username: &str) -> Result<(), AccountError> {
        if !self.users_write.delete_user(username).await? {
            return Err(AccountError::NotFound);
        }
        info!(target = "yatube::accounts", username, "user deleted");
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, AccountError> {
        let purged = self
            .sessions
            .purge_expired(OffsetDateTime::now_utc())
            .await?;
        Ok(purged)
    }

    async fn verified_session(&self, token: &str) -> Result<Option<SessionRecord>, AccountError> {
        let Some(parsed) = parse_token(token) else {
            return Ok(None);
        };
        let Some(session) = self.sessions.find_by_prefix(parsed.prefix).await? else {
            return Ok(None);
        };

        let hashed_input = hash_secret(parsed.secret);
        if session.secret_hash.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Ok(None);
        }
        Ok(Some(session))
    }
}

fn username_taken() -> AccountError {
    let mut errors = FieldErrors::default();
    errors.add("username", USERNAME_TAKEN_MESSAGE);
    AccountError::Invalid(errors)
}

fn invalid_login() -> AccountError {
    let mut errors = FieldErrors::default();
    errors.add_non_field(INVALID_LOGIN_MESSAGE);
    AccountError::Invalid(errors)
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ParsedToken<'a> {
    prefix: &'a str,
    secret: &'a str,
}

fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
    let (prefix, secret) = token.split_once('_')?;
    if prefix.len() != PREFIX_LEN || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken { prefix, secret })
}
