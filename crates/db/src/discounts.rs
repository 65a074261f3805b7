use anyhow::Result;
use pickup_models::DiscountCode;
use sqlx::SqliteExecutor;

const DISCOUNT_COLUMNS: &str = "id, code, description, discount_type, discount_value, max_uses, \
    current_uses, valid_from, valid_until, is_active, game_id, season_id, group_id";

#[derive(Debug, Clone)]
pub struct NewDiscountCode {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: i64,
    pub max_uses: Option<i64>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub game_id: Option<i64>,
    pub season_id: Option<i64>,
    pub group_id: Option<i64>,
}

/// Codes match case-insensitively.
pub async fn find_discount_code<'e>(db: impl SqliteExecutor<'e>, code: &str) -> Result<Option<DiscountCode>> {
    let sql = format!("SELECT {DISCOUNT_COLUMNS} FROM discount_codes WHERE code = ?");
    let row = sqlx::query_as::<_, DiscountCode>(&sql)
        .bind(code.trim())
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn insert_discount_code<'e>(db: impl SqliteExecutor<'e>, code: &NewDiscountCode) -> Result<DiscountCode> {
    let sql = format!(
        "INSERT INTO discount_codes (code, description, discount_type, discount_value, max_uses, \
            valid_from, valid_until, game_id, season_id, group_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {DISCOUNT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, DiscountCode>(&sql)
        .bind(code.code.trim())
        .bind(&code.description)
        .bind(&code.discount_type)
        .bind(code.discount_value)
        .bind(code.max_uses)
        .bind(&code.valid_from)
        .bind(&code.valid_until)
        .bind(code.game_id)
        .bind(code.season_id)
        .bind(code.group_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn increment_discount_uses<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<()> {
    sqlx::query("UPDATE discount_codes SET current_uses = current_uses + 1 WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
