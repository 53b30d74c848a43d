use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{Area, Language};
use crate::constants::{CROPPED_IMAGE_SENTINEL, MAX_BIO_LENGTH};
use crate::error::AppError;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(anyhow::anyhow!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// How a user presents their gender; several may apply.
    Gender {
        Female => "FEMALE",
        Male => "MALE",
        Private => "PRIVATE",
        X => "X",
    }
);

text_enum!(Interest {
    Travel => "TRAVEL",
    Food => "FOOD",
    Music => "MUSIC",
    Movies => "MOVIES",
    Sports => "SPORTS",
    Reading => "READING",
    Gaming => "GAMING",
    Art => "ART",
    Technology => "TECHNOLOGY",
    Languages => "LANGUAGES",
    Cooking => "COOKING",
    Photography => "PHOTOGRAPHY",
    Outdoors => "OUTDOORS",
    Fitness => "FITNESS",
    Other => "OTHER",
});

text_enum!(
    /// When a user is usually available to meet.
    Availability {
        Daytime => "DAYTIME",
        Evening => "EVENING",
        Weekends => "WEEKENDS",
    }
);

/// Profile as returned to clients, with relations resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub gender: Vec<Gender>,
    pub interests: Vec<Interest>,
    pub availability: Vec<Availability>,
    pub job_field: Option<String>,
    pub timezone: Option<String>,
    pub area: Option<Area>,
    pub native_languages: Vec<Language>,
    pub learning_languages: Vec<Language>,
    pub preference_areas: Vec<Area>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update as sent by the edit form.
///
/// Omitted fields are left untouched. List fields replace the stored set.
/// `image` follows its own rules, see [`ImageChange::classify`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    /// Current image URL (unchanged), `""` to remove, or a newly uploaded URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = MAX_BIO_LENGTH, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Vec<Gender>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "At least one native language is required"))]
    pub native_language_ids: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_language_ids: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_area_ids: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<Interest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Vec<Availability>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100, message = "Job field must be at most 100 characters"))]
    pub job_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64, message = "Invalid timezone"))]
    pub timezone: Option<String>,
}

fn validate_birth_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        let mut err = ValidationError::new("birth_date");
        err.message = Some("Birth date cannot be in the future".into());
        return Err(err);
    }
    Ok(())
}

impl UpdateProfileRequest {
    /// Every language id the request refers to.
    pub fn language_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .native_language_ids
            .iter()
            .chain(self.learning_language_ids.iter())
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Every area id the request refers to.
    pub fn area_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .preference_area_ids
            .iter()
            .flatten()
            .copied()
            .chain(self.area_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Convert into the tagged patch once `image` has been classified.
    pub fn into_patch(self, image: ImageChange) -> ProfilePatch {
        ProfilePatch {
            image,
            birth_date: self.birth_date,
            bio: self.bio,
            gender: self.gender.map(dedup),
            interests: self.interests.map(dedup),
            availability: self.availability.map(dedup),
            job_field: self.job_field,
            timezone: self.timezone,
            area_id: self.area_id,
            native_language_ids: self.native_language_ids.map(dedup),
            learning_language_ids: self.learning_language_ids.map(dedup),
            preference_area_ids: self.preference_area_ids.map(dedup),
        }
    }
}

fn dedup<T: PartialEq + Copy>(values: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// What a profile update does to the stored image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Unchanged,
    Remove,
    Replace(String),
}

impl ImageChange {
    /// Classify the `image` field of an update against the stored value.
    ///
    /// A URL may only become the new reference when `is_owned` accepts it. The
    /// stored value is always accepted back unchanged, even if it predates the
    /// current storage domain.
    pub fn classify(
        requested: Option<&str>,
        current: Option<&str>,
        is_owned: impl Fn(&str) -> bool,
    ) -> Result<Self, AppError> {
        let Some(requested) = requested.map(str::trim) else {
            return Ok(ImageChange::Unchanged);
        };

        if requested.is_empty() {
            return Ok(ImageChange::Remove);
        }
        if requested == CROPPED_IMAGE_SENTINEL {
            return Err(AppError::field(
                "image",
                "Upload the cropped image before saving the profile",
            ));
        }
        if current == Some(requested) {
            return Ok(ImageChange::Unchanged);
        }
        if is_owned(requested) {
            return Ok(ImageChange::Replace(requested.to_string()));
        }

        Err(AppError::field(
            "image",
            "Image must be uploaded through this service",
        ))
    }
}

/// Validated, tagged profile update handed to the transaction manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePatch {
    pub image: ImageChange,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
    pub gender: Option<Vec<Gender>>,
    pub interests: Option<Vec<Interest>>,
    pub availability: Option<Vec<Availability>>,
    pub job_field: Option<String>,
    pub timezone: Option<String>,
    pub area_id: Option<i32>,
    pub native_language_ids: Option<Vec<i32>>,
    pub learning_language_ids: Option<Vec<i32>>,
    pub preference_area_ids: Option<Vec<i32>>,
}

impl Default for ProfilePatch {
    fn default() -> Self {
        ProfilePatch {
            image: ImageChange::Unchanged,
            birth_date: None,
            bio: None,
            gender: None,
            interests: None,
            availability: None,
            job_field: None,
            timezone: None,
            area_id: None,
            native_language_ids: None,
            learning_language_ids: None,
            preference_area_ids: None,
        }
    }
}

impl ProfilePatch {
    /// Whether any column of the `profiles` table or its relations changes.
    pub fn touches_profile(&self) -> bool {
        self.bio.is_some()
            || self.gender.is_some()
            || self.interests.is_some()
            || self.availability.is_some()
            || self.job_field.is_some()
            || self.timezone.is_some()
            || self.area_id.is_some()
            || self.native_language_ids.is_some()
            || self.learning_language_ids.is_some()
            || self.preference_area_ids.is_some()
    }
}
