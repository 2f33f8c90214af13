//! User and profile storage.
//!
//! [`UserRepository`] is the seam a database-backed store would implement;
//! [`InMemoryUserRepository`] keeps everything in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use recruit_models::{split_skills, FieldErrors, ProfileResponse, ProfileUpdate, UserSummary};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{ApiError, ApiResult};

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user with this email already exists.";

/// Stored user account.
#[derive(Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl UserRecord {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Stored profile, one per user.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub user_id: i64,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<String>,
    pub experience_years: i32,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub is_recruiter: bool,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn empty(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            phone_number: None,
            date_of_birth: None,
            location: None,
            bio: None,
            skills: None,
            experience_years: 0,
            linkedin_url: None,
            github_url: None,
            is_recruiter: false,
            company: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Render together with the owning user.
    pub fn to_response(&self, user: &UserRecord) -> ProfileResponse {
        ProfileResponse {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            phone_number: self.phone_number.clone(),
            date_of_birth: self.date_of_birth,
            location: self.location.clone(),
            bio: self.bio.clone(),
            skills: self.skills.clone(),
            skills_list: split_skills(self.skills.as_deref()),
            experience_years: self.experience_years,
            linkedin_url: self.linkedin_url.clone(),
            github_url: self.github_url.clone(),
            is_recruiter: self.is_recruiter,
            company: self.company.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn apply(&mut self, update: &ProfileUpdate) {
        fn set<T: Clone>(target: &mut Option<T>, value: &Option<Option<T>>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut self.phone_number, &update.phone_number);
        set(&mut self.date_of_birth, &update.date_of_birth);
        set(&mut self.location, &update.location);
        set(&mut self.bio, &update.bio);
        set(&mut self.skills, &update.skills);
        set(&mut self.linkedin_url, &update.linkedin_url);
        set(&mut self.github_url, &update.github_url);
        set(&mut self.company, &update.company);
        if let Some(years) = update.experience_years {
            self.experience_years = years;
        }
        if let Some(is_recruiter) = update.is_recruiter {
            self.is_recruiter = is_recruiter;
        }
    }
}

/// Fields needed to create a user.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user and its empty profile.
    ///
    /// Fails with field errors on `username` / `email` when either is taken.
    async fn create_user(&self, new_user: NewUser) -> ApiResult<UserRecord>;

    async fn find_by_id(&self, id: i64) -> ApiResult<Option<UserRecord>>;

    async fn find_by_username(&self, username: &str) -> ApiResult<Option<UserRecord>>;

    /// Whether `email` is already registered.
    async fn email_exists(&self, email: &str) -> ApiResult<bool>;

    async fn username_exists(&self, username: &str) -> ApiResult<bool>;

    /// Fetch the profile for `user_id`, creating an empty one if missing.
    async fn get_or_create_profile(&self, user_id: i64) -> ApiResult<ProfileRecord>;

    /// Apply a partial update to the user's names and profile in one step.
    async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> ApiResult<(UserRecord, ProfileRecord)>;

    async fn set_active(&self, user_id: i64, active: bool) -> ApiResult<()>;
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, UserRecord>,
    profiles: HashMap<i64, ProfileRecord>,
}

impl Tables {
    fn by_username(&self, username: &str) -> Option<&UserRecord> {
        self.users.values().find(|u| u.username == username)
    }

    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
    }
}

/// Process-local repository.
#[derive(Default)]
pub struct InMemoryUserRepository {
    tables: RwLock<Tables>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, new_user: NewUser) -> ApiResult<UserRecord> {
        let mut tables = self.tables.write().await;

        let mut errors = FieldErrors::new();
        if tables.by_username(&new_user.username).is_some() {
            errors.add("username", USERNAME_TAKEN);
        }
        if tables.email_taken(&new_user.email) {
            errors.add("email", EMAIL_TAKEN);
        }
        errors.into_result()?;

        tables.next_id += 1;
        let now = Utc::now();
        let user = UserRecord {
            id: tables.next_id,
            username: new_user.username,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            password_hash: new_user.password_hash,
            is_active: true,
            date_joined: now,
        };

        tables.profiles.insert(user.id, ProfileRecord::empty(user.id, now));
        tables.users.insert(user.id, user.clone());

        info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> ApiResult<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> ApiResult<Option<UserRecord>> {
        Ok(self.tables.read().await.by_username(username).cloned())
    }

    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        Ok(self.tables.read().await.email_taken(email))
    }

    async fn username_exists(&self, username: &str) -> ApiResult<bool> {
        Ok(self.tables.read().await.by_username(username).is_some())
    }

    async fn get_or_create_profile(&self, user_id: i64) -> ApiResult<ProfileRecord> {
        if let Some(profile) = self.tables.read().await.profiles.get(&user_id) {
            return Ok(profile.clone());
        }

        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(ApiError::UserNotFound);
        }
        let profile = tables
            .profiles
            .entry(user_id)
            .or_insert_with(|| ProfileRecord::empty(user_id, Utc::now()))
            .clone();
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> ApiResult<(UserRecord, ProfileRecord)> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let user = tables.users.get_mut(&user_id).ok_or(ApiError::UserNotFound)?;
        if let Some(first_name) = &update.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.clone();
        }
        let user = user.clone();

        let profile = tables
            .profiles
            .entry(user_id)
            .or_insert_with(|| ProfileRecord::empty(user_id, now));
        profile.apply(update);
        profile.updated_at = now;

        Ok((user, profile.clone()))
    }

    async fn set_active(&self, user_id: i64, active: bool) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&user_id).ok_or(ApiError::UserNotFound)?;
        user.is_active = active;
        Ok(())
    }
}
