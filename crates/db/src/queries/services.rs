use crate::models::Service;
use anyhow::Result;
use sqlx::PgPool;

/// List the whole catalog
pub async fn list_all(pool: &PgPool) -> Result<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT * FROM services ORDER BY id"
    )
    .fetch_all(pool)
    .await?;

    Ok(services)
}

/// List services bookable by the given gender (its own plus 'both')
pub async fn list_for_gender(pool: &PgPool, gender: &str) -> Result<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        r#"
        SELECT * FROM services
        WHERE gender IN ($1, 'both')
        ORDER BY id
        "#
    )
    .bind(gender)
    .fetch_all(pool)
    .await?;

    Ok(services)
}

/// Resolve catalog entries for the given ids; unknown ids simply do not
/// appear in the result.
pub async fn find_by_ids(pool: &PgPool, ids: &[i32]) -> Result<Vec<Service>> {
    let services = sqlx::query_as::<_, Service>(
        r#"
        SELECT * FROM services
        WHERE id = ANY($1)
        ORDER BY id
        "#
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(services)
}
