//! User profile resource.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use validator::ValidateUrl;

use crate::auth::{BLANK, MAX_NAME_LENGTH};
use crate::validation::{check_max_chars, FieldErrors};

pub const MAX_PHONE_LENGTH: usize = 15;
pub const MAX_LOCATION_LENGTH: usize = 100;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_COMPANY_LENGTH: usize = 100;

/// Full profile representation returned by `GET /profile/` and `GET /user-info/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileResponse {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<String>,
    pub skills_list: Vec<String>,
    pub experience_years: i32,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub is_recruiter: bool,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update accepted by `PATCH /profile/`.
///
/// Nullable fields distinguish "absent" (`None`, leave unchanged) from an
/// explicit `null` (`Some(None)`, clear the value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub skills: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<i32>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub github_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recruiter: Option<bool>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub company: Option<Option<String>>,
}

/// Present-but-null becomes `Some(None)`; absence is handled by `default`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProfileUpdate {
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        // Names are optional in a patch, but a present name must not be blank
        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if let Some(name) = value {
                if name.trim().is_empty() {
                    errors.set(field, BLANK);
                } else {
                    check_max_chars(&mut errors, field, name, MAX_NAME_LENGTH);
                }
            }
        }
        if let Some(Some(phone)) = &self.phone_number {
            check_max_chars(&mut errors, "phone_number", phone, MAX_PHONE_LENGTH);
        }
        if let Some(Some(location)) = &self.location {
            check_max_chars(&mut errors, "location", location, MAX_LOCATION_LENGTH);
        }
        if let Some(Some(bio)) = &self.bio {
            check_max_chars(&mut errors, "bio", bio, MAX_BIO_LENGTH);
        }
        if let Some(Some(company)) = &self.company {
            check_max_chars(&mut errors, "company", company, MAX_COMPANY_LENGTH);
        }

        for (field, value) in [("linkedin_url", &self.linkedin_url), ("github_url", &self.github_url)] {
            if let Some(Some(url)) = value {
                if !url.is_empty() && !url.validate_url() {
                    errors.add(field, "Enter a valid URL.");
                }
            }
        }

        errors.into_result()
    }
}

/// Split a comma-separated skills string, trimming and dropping empties.
pub fn split_skills(skills: Option<&str>) -> Vec<String> {
    skills
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
