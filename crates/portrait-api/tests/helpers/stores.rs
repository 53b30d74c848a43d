use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use portrait_core::models::{
    Area, ImageChange, Language, Profile, ProfilePatch, User, UserWithProfile,
};
use portrait_core::AppError;
use portrait_db::{ProfileStore, ReferenceStore};
use uuid::Uuid;

pub fn languages() -> Vec<Language> {
    [(1, "Deutsch", "de"), (2, "English", "en"), (3, "Français", "fr")]
        .into_iter()
        .map(|(id, name, code)| Language {
            id,
            name: name.to_string(),
            code: code.to_string(),
        })
        .collect()
}

pub fn areas() -> Vec<Area> {
    ["Altona", "Eimsbüttel", "Mitte"]
        .into_iter()
        .zip(1..)
        .map(|(name, id)| Area {
            id,
            name: name.to_string(),
            city: "Hamburg".to_string(),
            country: "Germany".to_string(),
        })
        .collect()
}

/// Users and profiles kept in a map.
#[derive(Default)]
pub struct InMemoryProfiles {
    users: Mutex<HashMap<Uuid, UserWithProfile>>,
    patches: Mutex<Vec<ProfilePatch>>,
}

impl InMemoryProfiles {
    /// Insert a user without profile and return its id.
    pub fn insert_user(&self, image: Option<&str>) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: format!("{}@example.com", id),
            name: Some("Test User".to_string()),
            image: image.map(String::from),
            birth_date: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(
            id,
            UserWithProfile {
                user,
                profile: None,
            },
        );
        id
    }

    pub fn image_of(&self, id: Uuid) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|u| u.user.image.clone())
    }

    /// Patches applied so far, oldest first.
    pub fn patches(&self) -> Vec<ProfilePatch> {
        self.patches.lock().unwrap().clone()
    }
}

fn pick<T: Clone>(all: &[T], ids: &[i32], id_of: impl Fn(&T) -> i32) -> Vec<T> {
    ids.iter()
        .filter_map(|id| all.iter().find(|item| id_of(item) == *id).cloned())
        .collect()
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn find_user_with_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserWithProfile>, AppError> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn current_image(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|u| u.user.image.clone())
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn apply_patch(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<UserWithProfile, AppError> {
        let mut users = self.users.lock().unwrap();
        let entry = users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let now = Utc::now();

        match &patch.image {
            ImageChange::Unchanged => {}
            ImageChange::Remove => entry.user.image = None,
            ImageChange::Replace(url) => entry.user.image = Some(url.clone()),
        }
        if let Some(date) = patch.birth_date {
            entry.user.birth_date = Some(date);
        }
        entry.user.updated_at = now;

        if patch.touches_profile() {
            let profile = entry.profile.get_or_insert_with(|| Profile {
                user_id,
                bio: None,
                gender: Vec::new(),
                interests: Vec::new(),
                availability: Vec::new(),
                job_field: None,
                timezone: None,
                area: None,
                native_languages: Vec::new(),
                learning_languages: Vec::new(),
                preference_areas: Vec::new(),
                created_at: now,
                updated_at: now,
            });
            if let Some(bio) = &patch.bio {
                profile.bio = Some(bio.clone());
            }
            if let Some(gender) = &patch.gender {
                profile.gender = gender.clone();
            }
            if let Some(ids) = &patch.native_language_ids {
                profile.native_languages = pick(&languages(), ids, |l| l.id);
            }
            if let Some(ids) = &patch.learning_language_ids {
                profile.learning_languages = pick(&languages(), ids, |l| l.id);
            }
            if let Some(id) = patch.area_id {
                profile.area = pick(&areas(), &[id], |a| a.id).into_iter().next();
            }
            if let Some(ids) = &patch.preference_area_ids {
                profile.preference_areas = pick(&areas(), ids, |a| a.id);
            }
            profile.updated_at = now;
        }

        self.patches.lock().unwrap().push(patch.clone());
        Ok(entry.clone())
    }
}

/// Fixed reference data.
pub struct InMemoryReference {
    languages: Vec<Language>,
    areas: Vec<Area>,
}

impl InMemoryReference {
    pub fn seeded() -> Self {
        Self {
            languages: languages(),
            areas: areas(),
        }
    }
}

#[async_trait]
impl ReferenceStore for InMemoryReference {
    async fn languages(&self) -> Result<Vec<Language>, AppError> {
        Ok(self.languages.clone())
    }

    async fn areas(&self) -> Result<Vec<Area>, AppError> {
        Ok(self.areas.clone())
    }

    async fn unknown_language_ids(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !self.languages.iter().any(|l| l.id == *id))
            .collect())
    }

    async fn unknown_area_ids(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !self.areas.iter().any(|a| a.id == *id))
            .collect())
    }
}
