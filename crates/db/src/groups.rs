use anyhow::Result;
use pickup_models::Group;
use sqlx::SqliteExecutor;

const GROUP_COLUMNS: &str = "id, name, slug, description, created_at";

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

pub async fn list_groups<'e>(db: impl SqliteExecutor<'e>) -> Result<Vec<Group>> {
    let sql = format!("SELECT {GROUP_COLUMNS} FROM groups ORDER BY name");
    let groups = sqlx::query_as::<_, Group>(&sql).fetch_all(db).await?;
    Ok(groups)
}

pub async fn get_group_by_slug<'e>(db: impl SqliteExecutor<'e>, slug: &str) -> Result<Option<Group>> {
    let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE slug = ?");
    let group = sqlx::query_as::<_, Group>(&sql)
        .bind(slug)
        .fetch_optional(db)
        .await?;
    Ok(group)
}

pub async fn insert_group<'e>(db: impl SqliteExecutor<'e>, group: &NewGroup) -> Result<Group> {
    let sql = format!(
        "INSERT INTO groups (name, slug, description) VALUES (?, ?, ?) RETURNING {GROUP_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Group>(&sql)
        .bind(&group.name)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(db)
        .await?;
    Ok(row)
}
