use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Medical profile, one per user. Saved wholesale; partial updates are not a
/// thing — the client always submits the full form.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub age: i32,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub existing_conditions: Option<String>,
    pub allergies: Option<String>,
    pub smoking_habit: Option<String>,
    pub alcohol_habit: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Field values for one save. Mirrors the profile form.
#[derive(Debug, Clone)]
pub struct ProfileFields {
    pub name: String,
    pub age: i32,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub existing_conditions: Option<String>,
    pub allergies: Option<String>,
    pub smoking_habit: Option<String>,
    pub alcohol_habit: Option<String>,
}

impl Profile {
    pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, user_id, name, age, gender, height_cm, weight_kg,
                   existing_conditions, allergies, smoking_habit, alcohol_habit,
                   created_at, updated_at
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Upsert keyed by user_id: at most one profile per user, and the second
    /// save wins wholesale with a bumped updated_at.
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        fields: &ProfileFields,
    ) -> anyhow::Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (
                user_id, name, age, gender, height_cm, weight_kg,
                existing_conditions, allergies, smoking_habit, alcohol_habit
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                name = EXCLUDED.name,
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                height_cm = EXCLUDED.height_cm,
                weight_kg = EXCLUDED.weight_kg,
                existing_conditions = EXCLUDED.existing_conditions,
                allergies = EXCLUDED.allergies,
                smoking_habit = EXCLUDED.smoking_habit,
                alcohol_habit = EXCLUDED.alcohol_habit,
                updated_at = now()
            RETURNING id, user_id, name, age, gender, height_cm, weight_kg,
                      existing_conditions, allergies, smoking_habit, alcohol_habit,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&fields.name)
        .bind(fields.age)
        .bind(&fields.gender)
        .bind(fields.height_cm)
        .bind(fields.weight_kg)
        .bind(&fields.existing_conditions)
        .bind(&fields.allergies)
        .bind(&fields.smoking_habit)
        .bind(&fields.alcohol_habit)
        .fetch_one(db)
        .await?;
        Ok(profile)
    }
}
