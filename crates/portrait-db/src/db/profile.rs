//! Profile transaction manager
//!
//! A profile update touches `users`, `profiles` and three relation tables.
//! [`ProfileRepository::apply_patch`] writes all of them in one transaction so
//! a failure anywhere leaves the stored profile exactly as it was.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use portrait_core::models::{
    Area, Availability, Gender, ImageChange, Interest, Language, Profile, ProfilePatch, User,
    UserWithProfile,
};
use portrait_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use super::transaction::with_transaction;

/// Profile persistence as seen by the HTTP layer.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_user_with_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserWithProfile>, AppError>;

    /// Stored image reference of the user. Fails with `NotFound` for an
    /// unknown user.
    async fn current_image(&self, user_id: Uuid) -> Result<Option<String>, AppError>;

    /// Apply a validated patch atomically and return the updated user.
    async fn apply_patch(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<UserWithProfile, AppError>;
}

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    bio: Option<String>,
    gender: Vec<String>,
    interests: Vec<String>,
    availability: Vec<String>,
    job_field: Option<String>,
    timezone: Option<String>,
    area_id: Option<i32>,
    area_name: Option<String>,
    area_city: Option<String>,
    area_country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Relation tables replaced wholesale by a patch.
#[derive(Debug, Clone, Copy)]
enum Relation {
    NativeLanguages,
    LearningLanguages,
    PreferenceAreas,
}

impl Relation {
    fn table(&self) -> &'static str {
        match self {
            Relation::NativeLanguages => "profile_native_languages",
            Relation::LearningLanguages => "profile_learning_languages",
            Relation::PreferenceAreas => "profile_preference_areas",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            Relation::NativeLanguages | Relation::LearningLanguages => "language_id",
            Relation::PreferenceAreas => "area_id",
        }
    }
}

/// Parse stored enum labels, skipping values this build no longer knows.
fn parse_labels<T: FromStr>(labels: Vec<String>, column: &'static str) -> Vec<T> {
    labels
        .into_iter()
        .filter_map(|label| match label.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(column, label = %label, "Ignoring unknown stored value");
                None
            }
        })
        .collect()
}

fn labels<T: ToString>(values: &Option<Vec<T>>) -> Option<Vec<String>> {
    values
        .as_ref()
        .map(|values| values.iter().map(ToString::to_string).collect())
}

impl ProfileRow {
    fn into_profile(
        self,
        native_languages: Vec<Language>,
        learning_languages: Vec<Language>,
        preference_areas: Vec<Area>,
    ) -> Profile {
        let area = match (self.area_id, self.area_name, self.area_city, self.area_country) {
            (Some(id), Some(name), Some(city), Some(country)) => Some(Area {
                id,
                name,
                city,
                country,
            }),
            _ => None,
        };

        Profile {
            user_id: self.user_id,
            bio: self.bio,
            gender: parse_labels::<Gender>(self.gender, "gender"),
            interests: parse_labels::<Interest>(self.interests, "interests"),
            availability: parse_labels::<Availability>(self.availability, "availability"),
            job_field: self.job_field,
            timezone: self.timezone,
            area,
            native_languages,
            learning_languages,
            preference_areas,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, email, name, image, birth_date, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query_as::<Postgres, ProfileRow>(
            r#"
            SELECT p.user_id, p.bio, p.gender, p.interests, p.availability,
                   p.job_field, p.timezone, p.area_id,
                   a.name AS area_name, a.city AS area_city, a.country AS area_country,
                   p.created_at, p.updated_at
            FROM profiles p
            LEFT JOIN areas a ON a.id = p.area_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let native = self
            .related_languages(user_id, Relation::NativeLanguages)
            .await?;
        let learning = self
            .related_languages(user_id, Relation::LearningLanguages)
            .await?;
        let preference_areas = sqlx::query_as::<Postgres, Area>(
            r#"
            SELECT a.id, a.name, a.city, a.country
            FROM areas a
            JOIN profile_preference_areas r ON r.area_id = a.id
            WHERE r.user_id = $1
            ORDER BY a.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_profile(native, learning, preference_areas)))
    }

    async fn related_languages(
        &self,
        user_id: Uuid,
        relation: Relation,
    ) -> Result<Vec<Language>, AppError> {
        let sql = format!(
            "SELECT l.id, l.name, l.code FROM languages l \
             JOIN {} r ON r.language_id = l.id \
             WHERE r.user_id = $1 ORDER BY l.name ASC",
            relation.table()
        );
        let languages = sqlx::query_as::<Postgres, Language>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(languages)
    }
}

async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> Result<(), AppError> {
    let found =
        sqlx::query_scalar::<Postgres, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("User not found".to_string())),
    }
}

async fn update_user_columns(
    conn: &mut PgConnection,
    user_id: Uuid,
    patch: &ProfilePatch,
) -> Result<(), AppError> {
    let (touch_image, image) = match &patch.image {
        ImageChange::Unchanged => (false, None),
        ImageChange::Remove => (true, None),
        ImageChange::Replace(url) => (true, Some(url.as_str())),
    };

    if !touch_image && patch.birth_date.is_none() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE users
        SET image = CASE WHEN $2 THEN $3 ELSE image END,
            birth_date = COALESCE($4, birth_date),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(touch_image)
    .bind(image)
    .bind(patch.birth_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
    patch: &ProfilePatch,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, bio, gender, interests, availability, job_field, timezone, area_id)
        VALUES ($1, $2, COALESCE($3::TEXT[], '{}'), COALESCE($4::TEXT[], '{}'),
                COALESCE($5::TEXT[], '{}'), $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE
        SET bio = COALESCE($2, profiles.bio),
            gender = COALESCE($3::TEXT[], profiles.gender),
            interests = COALESCE($4::TEXT[], profiles.interests),
            availability = COALESCE($5::TEXT[], profiles.availability),
            job_field = COALESCE($6, profiles.job_field),
            timezone = COALESCE($7, profiles.timezone),
            area_id = COALESCE($8, profiles.area_id),
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(patch.bio.as_deref())
    .bind(labels(&patch.gender))
    .bind(labels(&patch.interests))
    .bind(labels(&patch.availability))
    .bind(patch.job_field.as_deref())
    .bind(patch.timezone.as_deref())
    .bind(patch.area_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn replace_relation(
    conn: &mut PgConnection,
    user_id: Uuid,
    relation: Relation,
    ids: &[i32],
) -> Result<(), AppError> {
    let delete = format!("DELETE FROM {} WHERE user_id = $1", relation.table());
    sqlx::query(&delete)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if ids.is_empty() {
        return Ok(());
    }

    let insert = format!(
        "INSERT INTO {} (user_id, {}) SELECT $1, UNNEST($2::INT[])",
        relation.table(),
        relation.column()
    );
    sqlx::query(&insert)
        .bind(user_id)
        .bind(ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[async_trait::async_trait]
impl ProfileStore for ProfileRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn find_user_with_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserWithProfile>, AppError> {
        let Some(user) = self.find_user(user_id).await? else {
            return Ok(None);
        };
        let profile = self.find_profile(user_id).await?;

        Ok(Some(UserWithProfile { user, profile }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn current_image(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        let image = sqlx::query_scalar::<Postgres, Option<String>>(
            "SELECT image FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        image.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    #[tracing::instrument(
        skip(self, patch),
        fields(db.table = "profiles", db.operation = "upsert")
    )]
    async fn apply_patch(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<UserWithProfile, AppError> {
        let change = match &patch.image {
            ImageChange::Unchanged => "unchanged",
            ImageChange::Remove => "remove",
            ImageChange::Replace(_) => "replace",
        };
        let patch = patch.clone();

        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let conn: &mut PgConnection = tx;
                lock_user(conn, user_id).await?;
                update_user_columns(conn, user_id, &patch).await?;

                if patch.touches_profile() {
                    upsert_profile(conn, user_id, &patch).await?;

                    let relations = [
                        (Relation::NativeLanguages, &patch.native_language_ids),
                        (Relation::LearningLanguages, &patch.learning_language_ids),
                        (Relation::PreferenceAreas, &patch.preference_area_ids),
                    ];
                    for (relation, ids) in relations {
                        if let Some(ids) = ids {
                            replace_relation(conn, user_id, relation, ids).await?;
                        }
                    }
                }

                Ok(())
            })
        })
        .await?;

        tracing::info!(user_id = %user_id, image = change, "Profile updated");

        self.find_user_with_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_skips_unknown_values() {
        let parsed = parse_labels::<Availability>(
            vec!["EVENING".to_string(), "NIGHT_OWL".to_string()],
            "availability",
        );
        assert_eq!(parsed, vec![Availability::Evening]);
    }

    #[test]
    fn test_labels_use_stored_text() {
        let stored = labels(&Some(vec![Gender::Female, Gender::X]));
        assert_eq!(stored, Some(vec!["FEMALE".to_string(), "X".to_string()]));
        assert_eq!(labels::<Gender>(&None), None);
    }

    #[test]
    fn test_relation_tables() {
        assert_eq!(Relation::PreferenceAreas.column(), "area_id");
        assert_eq!(
            Relation::LearningLanguages.table(),
            "profile_learning_languages"
        );
    }
}
