//! # Postgres store
//!
//! Maps the relational schema in `migrations/` onto the domain models. A
//! [`ChangeSet`] is applied inside one transaction, so a failing change
//! rolls back everything staged with it.

use std::collections::HashMap;

use async_trait::async_trait;
use domains::{
    Advert, AdvertId, AdvertParts, AdvertRepository, Application, ApplicationId,
    ApplicationRepository, Category, CategoryId, CategoryRepository, Change, ChangeSet,
    CommitReceipt, Image, ImageId, RepositoryError, UnitOfWork,
};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::migrations::MIGRATOR;

const ADVERT_SELECT: &str = "SELECT a.id, a.date, a.title, a.author, a.content, a.published, \
     a.updated_at, a.nb_applications, a.slug, \
     i.id AS image_id, i.url AS image_url, i.alt AS image_alt \
     FROM advert a LEFT JOIN image i ON i.id = a.image_id";

pub struct PgStore {
    pool: PgPool,
}

/// Translates driver errors into the storage error vocabulary.
fn db_err(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        match db.kind() {
            ErrorKind::UniqueViolation => {
                let column = db
                    .constraint()
                    .map(|name| {
                        name.trim_start_matches("advert_")
                            .trim_end_matches("_key")
                            .to_string()
                    })
                    .unwrap_or_else(|| "unknown".to_string());
                return RepositoryError::UniqueViolation { column };
            }
            ErrorKind::ForeignKeyViolation => {
                return RepositoryError::ForeignKeyViolation(db.message().to_string());
            }
            _ => {}
        }
    }
    RepositoryError::Backend(e.to_string())
}

fn missing(entity: &str, id: impl ToString) -> RepositoryError {
    RepositoryError::Missing {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(db_err)?;
        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies every pending migration.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    /// Reverts applied migrations newer than `target`.
    pub async fn revert_to(&self, target: i64) -> Result<(), RepositoryError> {
        MIGRATOR
            .undo(&self.pool, target)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))
    }

    fn advert_from_row(row: &PgRow) -> Result<(AdvertId, AdvertParts), sqlx::Error> {
        let id = AdvertId(row.try_get("id")?);
        let image = match row.try_get::<Option<i64>, _>("image_id")? {
            Some(image_id) => Some(Image {
                id: Some(ImageId(image_id)),
                url: row.try_get("image_url")?,
                alt: row.try_get("image_alt")?,
            }),
            None => None,
        };
        let count: i32 = row.try_get("nb_applications")?;
        Ok((
            id,
            AdvertParts {
                id,
                date: row.try_get("date")?,
                title: row.try_get("title")?,
                author: row.try_get("author")?,
                content: row.try_get("content")?,
                published: row.try_get("published")?,
                image,
                categories: Vec::new(),
                applications: Vec::new(),
                updated_at: row.try_get("updated_at")?,
                application_count: u32::try_from(count).unwrap_or(0),
                slug: row.try_get("slug")?,
            },
        ))
    }

    fn application_from_row(row: &PgRow) -> Result<Application, sqlx::Error> {
        Ok(Application::restore(
            ApplicationId(row.try_get::<Uuid, _>("id")?),
            row.try_get("author")?,
            row.try_get("content")?,
            Some(AdvertId(row.try_get("advert_id")?)),
        ))
    }

    /// Builds adverts from rows and eager-loads their categories.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Advert>, RepositoryError> {
        let mut parts = rows
            .iter()
            .map(Self::advert_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        if parts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = parts.iter().map(|(id, _)| id.get()).collect();
        let links = sqlx::query(
            "SELECT ac.advert_id, c.id, c.name FROM advert_category ac \
             JOIN category c ON c.id = ac.category_id \
             WHERE ac.advert_id = ANY($1) ORDER BY c.name, c.id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_advert: HashMap<i64, Vec<Category>> = HashMap::new();
        for link in &links {
            let advert_id: i64 = link.try_get("advert_id").map_err(db_err)?;
            by_advert.entry(advert_id).or_default().push(Category {
                id: Some(CategoryId(link.try_get("id").map_err(db_err)?)),
                name: link.try_get("name").map_err(db_err)?,
            });
        }

        for (id, part) in &mut parts {
            part.categories = by_advert.remove(&id.get()).unwrap_or_default();
        }
        Ok(parts.into_iter().map(|(_, p)| Advert::restore(p)).collect())
    }

    async fn find_one(&self, clause: &str, value: &str) -> Result<Option<Advert>, RepositoryError> {
        let rows = sqlx::query(&format!("{ADVERT_SELECT} WHERE {clause} = $1 LIMIT 1"))
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(self.hydrate(rows).await?.into_iter().next())
    }
}

async fn save_image(conn: &mut PgConnection, image: &Image) -> Result<ImageId, sqlx::Error> {
    if let Some(id) = image.id {
        let updated = sqlx::query("UPDATE image SET url = $1, alt = $2 WHERE id = $3")
            .bind(&image.url)
            .bind(&image.alt)
            .bind(id.get())
            .execute(&mut *conn)
            .await?;
        if updated.rows_affected() > 0 {
            return Ok(id);
        }
    }
    let id: i64 = sqlx::query_scalar("INSERT INTO image (url, alt) VALUES ($1, $2) RETURNING id")
        .bind(&image.url)
        .bind(&image.alt)
        .fetch_one(&mut *conn)
        .await?;
    Ok(ImageId(id))
}

async fn save_advert(conn: &mut PgConnection, advert: &Advert) -> Result<AdvertId, RepositoryError> {
    let previous_image: Option<i64> = match advert.id() {
        Some(id) => sqlx::query_scalar("SELECT image_id FROM advert WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing("Advert", id))?,
        None => None,
    };

    let image_id = match advert.image() {
        Some(image) => Some(save_image(conn, image).await.map_err(db_err)?),
        None => None,
    };
    let count = i32::try_from(advert.application_count()).unwrap_or(i32::MAX);

    let id = match advert.id() {
        Some(id) => {
            sqlx::query(
                "UPDATE advert SET image_id = $1, date = $2, title = $3, author = $4, \
                 content = $5, published = $6, updated_at = $7, nb_applications = $8, \
                 slug = $9 WHERE id = $10",
            )
            .bind(image_id.map(ImageId::get))
            .bind(advert.date())
            .bind(advert.title())
            .bind(advert.author())
            .bind(advert.content())
            .bind(advert.published())
            .bind(advert.updated_at())
            .bind(count)
            .bind(advert.slug())
            .bind(id.get())
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
            id
        }
        None => {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO advert (image_id, date, title, author, content, published, \
                 updated_at, nb_applications, slug) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
            )
            .bind(image_id.map(ImageId::get))
            .bind(advert.date())
            .bind(advert.title())
            .bind(advert.author())
            .bind(advert.content())
            .bind(advert.published())
            .bind(advert.updated_at())
            .bind(count)
            .bind(advert.slug())
            .fetch_one(&mut *conn)
            .await
            .map_err(db_err)?;
            AdvertId(id)
        }
    };

    if let Some(old) = previous_image.filter(|old| Some(*old) != image_id.map(ImageId::get)) {
        sqlx::query("DELETE FROM image WHERE id = $1")
            .bind(old)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }

    sqlx::query("DELETE FROM advert_category WHERE advert_id = $1")
        .bind(id.get())
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    for category in advert.categories() {
        let category_id = category.id.ok_or_else(|| {
            RepositoryError::ForeignKeyViolation(format!("category `{}` is not stored", category.name))
        })?;
        sqlx::query("INSERT INTO advert_category (advert_id, category_id) VALUES ($1, $2)")
            .bind(id.get())
            .bind(category_id.get())
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }

    Ok(id)
}

async fn remove_advert(conn: &mut PgConnection, id: AdvertId) -> Result<(), RepositoryError> {
    let image_id: Option<i64> =
        sqlx::query_scalar("DELETE FROM advert WHERE id = $1 RETURNING image_id")
            .bind(id.get())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing("Advert", id))?;
    if let Some(image_id) = image_id {
        sqlx::query("DELETE FROM image WHERE id = $1")
            .bind(image_id)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

async fn save_application(
    conn: &mut PgConnection,
    application: &Application,
) -> Result<(), RepositoryError> {
    let advert = application.advert().ok_or_else(|| {
        RepositoryError::ForeignKeyViolation("application is not attached to an advert".into())
    })?;
    sqlx::query(
        "INSERT INTO application (id, advert_id, author, content) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO UPDATE SET advert_id = EXCLUDED.advert_id, \
         author = EXCLUDED.author, content = EXCLUDED.content",
    )
    .bind(application.id().0)
    .bind(advert.get())
    .bind(application.author())
    .bind(application.content())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn remove_application(
    conn: &mut PgConnection,
    id: ApplicationId,
) -> Result<(), RepositoryError> {
    let deleted = sqlx::query("DELETE FROM application WHERE id = $1")
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    if deleted.rows_affected() == 0 {
        return Err(missing("Application", id));
    }
    Ok(())
}

async fn save_category(
    conn: &mut PgConnection,
    category: &Category,
) -> Result<CategoryId, RepositoryError> {
    match category.id {
        Some(id) => {
            let updated = sqlx::query("UPDATE category SET name = $1 WHERE id = $2")
                .bind(&category.name)
                .bind(id.get())
                .execute(&mut *conn)
                .await
                .map_err(db_err)?;
            if updated.rows_affected() == 0 {
                return Err(missing("Category", id));
            }
            Ok(id)
        }
        None => {
            let id: i64 =
                sqlx::query_scalar("INSERT INTO category (name) VALUES ($1) RETURNING id")
                    .bind(&category.name)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(db_err)?;
            Ok(CategoryId(id))
        }
    }
}

#[async_trait]
impl AdvertRepository for PgStore {
    async fn find(&self, id: AdvertId) -> Result<Option<Advert>, RepositoryError> {
        let rows = sqlx::query(&format!("{ADVERT_SELECT} WHERE a.id = $1"))
            .bind(id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(mut advert) = self.hydrate(rows).await?.into_iter().next() else {
            return Ok(None);
        };
        for mut application in ApplicationRepository::find_by_advert(self, id).await? {
            advert.add_application(&mut application);
        }
        Ok(Some(advert))
    }

    async fn find_all(&self) -> Result<Vec<Advert>, RepositoryError> {
        let rows = sqlx::query(&format!("{ADVERT_SELECT} ORDER BY a.id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn find_ordered_by_date_desc(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Advert>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{ADVERT_SELECT} ORDER BY a.date DESC, a.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate(rows).await
    }

    async fn count_all(&self) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM advert")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Advert>, RepositoryError> {
        self.find_one("a.title", title).await
    }

    async fn find_by_author(&self, author: &str) -> Result<Option<Advert>, RepositoryError> {
        self.find_one("a.author", author).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Advert>, RepositoryError> {
        self.find_one("a.slug", slug).await
    }
}

#[async_trait]
impl ApplicationRepository for PgStore {
    async fn find(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let row = sqlx::query("SELECT id, advert_id, author, content FROM application WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref()
            .map(Self::application_from_row)
            .transpose()
            .map_err(db_err)
    }

    async fn find_by_advert(&self, advert: AdvertId) -> Result<Vec<Application>, RepositoryError> {
        sqlx::query(
            "SELECT id, advert_id, author, content FROM application \
             WHERE advert_id = $1 ORDER BY id",
        )
        .bind(advert.get())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(Self::application_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)
    }
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn find_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name FROM category ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: Some(CategoryId(row.try_get("id")?)),
                    name: row.try_get("name")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(db_err)
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut receipt = CommitReceipt::default();
        let count = changes.len();

        // Dropping `tx` on an early return rolls the transaction back.
        for change in changes.into_changes() {
            match change {
                Change::SaveAdvert(advert) => {
                    receipt.adverts.push(save_advert(&mut *tx, &advert).await?);
                }
                Change::RemoveAdvert(id) => remove_advert(&mut *tx, id).await?,
                Change::SaveApplication(application) => {
                    save_application(&mut *tx, &application).await?
                }
                Change::RemoveApplication(id) => remove_application(&mut *tx, id).await?,
                Change::SaveCategory(category) => {
                    receipt.categories.push(save_category(&mut *tx, &category).await?);
                }
            }
        }

        tx.commit().await.map_err(db_err)?;
        debug!(changes = count, "transaction committed");
        Ok(receipt)
    }
}
