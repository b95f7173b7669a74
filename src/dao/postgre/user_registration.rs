use sqlx::Error;

use crate::model::{Table, User_Registration};

impl Table<User_Registration> {
    pub async fn get_one(
        &self,
        address: &str,
    ) -> Result<Option<User_Registration>, Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM "user_registration" WHERE "address" = $1
            "#,
        )
        .bind(address)
        .persistent(true)
        .fetch_optional(&self.pool)
        .await
    }
}
