use chrono::{DateTime, Utc};
use sqlx::Error;

use crate::model::{Address_Category, Table};

impl Table<Address_Category> {
    pub async fn upsert(
        &self,
        address: &str,
        category: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        const SQL: &str = r#"
        INSERT INTO "address_category" ("address", "category", "updated_at")
        VALUES ($1, $2, $3)
        ON CONFLICT ("address") DO UPDATE
        SET "category" = EXCLUDED."category", "updated_at" = EXCLUDED."updated_at"
        "#;

        sqlx::query(SQL)
            .bind(address)
            .bind(category)
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .map(drop)
    }

    pub async fn get_one(
        &self,
        address: &str,
    ) -> Result<Option<Address_Category>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "address_category" WHERE "address" = $1
            "#,
        )
        .bind(address)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }
}
