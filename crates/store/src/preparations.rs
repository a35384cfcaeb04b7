use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemType, LineItemId, OrderId};
use domain::{PreparationOrder, PreparationRepository, RepositoryError, Station};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{Result, insert_error};

/// PostgreSQL-backed preparation records of one station.
#[derive(Clone)]
pub struct PostgresPreparationRepository {
    pool: PgPool,
    station: Station,
}

impl PostgresPreparationRepository {
    pub fn new(pool: PgPool, station: Station) -> Self {
        Self { pool, station }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn station(&self) -> Station {
        self.station
    }

    /// Runs the migrations of this repository's station.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        let mut migrator = match self.station {
            Station::Barista => sqlx::migrate!("../../migrations/barista"),
            Station::Kitchen => sqlx::migrate!("../../migrations/kitchen"),
        };
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await
    }

    fn table(&self) -> &'static str {
        match self.station {
            Station::Barista => "barista_orders",
            Station::Kitchen => "kitchen_orders",
        }
    }

    fn row_to_record(row: &PgRow) -> Result<PreparationOrder> {
        Ok(PreparationOrder {
            id: LineItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            item_name: row.try_get("item_name")?,
            item_type: ItemType::try_from(row.try_get::<i32, _>("item_type")?)?,
            time_up: row.try_get::<DateTime<Utc>, _>("time_up")?,
            created: row.try_get::<DateTime<Utc>, _>("created")?,
            updated: row.try_get::<DateTime<Utc>, _>("updated")?,
        })
    }

    async fn load(&self, id: LineItemId) -> Result<Option<PreparationOrder>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT id, order_id, item_type, item_name, time_up, created, updated FROM {} WHERE id = $1",
            self.table()
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn load_all(&self) -> Result<Vec<PreparationOrder>> {
        sqlx::query(&format!(
            "SELECT id, order_id, item_type, item_name, time_up, created, updated FROM {} ORDER BY created ASC",
            self.table()
        ))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::row_to_record)
        .collect()
    }
}

#[async_trait]
impl PreparationRepository for PostgresPreparationRepository {
    async fn create(&self, order: &PreparationOrder) -> std::result::Result<(), RepositoryError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, order_id, item_type, item_name, time_up, created, updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            self.table()
        ))
        .bind(order.id.as_uuid())
        .bind(order.order_id.as_uuid())
        .bind(order.item_type.code())
        .bind(&order.item_name)
        .bind(order.time_up)
        .bind(order.created)
        .bind(order.updated)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "preparation order", order.id.to_string()))?;

        tracing::debug!(station = %self.station, line_item_id = %order.id, "Preparation row inserted");
        Ok(())
    }

    async fn get_by_id(
        &self,
        id: LineItemId,
    ) -> std::result::Result<PreparationOrder, RepositoryError> {
        self.load(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "preparation order",
                id: id.to_string(),
            })
    }

    async fn get_all(&self) -> std::result::Result<Vec<PreparationOrder>, RepositoryError> {
        Ok(self.load_all().await?)
    }
}
