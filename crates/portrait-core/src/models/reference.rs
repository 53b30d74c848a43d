use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A language users can list as native or learning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Language {
    pub id: i32,
    pub name: String,
    /// ISO 639-1 code
    pub code: String,
}

/// A selectable area (district of a city)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub country: String,
}

/// Reference data needed to render the profile form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigResponse {
    pub languages: Vec<Language>,
    pub areas: Vec<Area>,
}
