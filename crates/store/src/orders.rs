use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemType, LineItemId, Location, LoyaltyMemberId, Money, OrderId, OrderSource, Status};
use domain::{LineItem, Order, OrderParts, OrderRepository, RepositoryError};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{Result, StoreError, insert_error};

const ORDER_COLUMNS: &str =
    "id, order_source, loyalty_member_id, order_status, location, version, created_at, updated_at";

const LINE_ITEM_COLUMNS: &str =
    "id, order_id, item_type, name, price_cents, item_status, is_barista_order";

enum WriteOutcome {
    Written(i64),
    Stale(i64),
    Missing,
}

/// PostgreSQL-backed order repository for the counter.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new repository over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the counter's migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        let mut migrator = sqlx::migrate!("../../migrations/counter");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await
    }

    fn row_to_line_item(row: &PgRow) -> Result<LineItem> {
        Ok(LineItem {
            id: LineItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            item_type: ItemType::try_from(row.try_get::<i32, _>("item_type")?)?,
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            status: Status::try_from(row.try_get::<i32, _>("item_status")?)?,
            is_barista_line: row.try_get("is_barista_order")?,
        })
    }

    fn row_to_order(row: &PgRow, line_items: Vec<LineItem>) -> Result<Order> {
        Ok(Order::restore(OrderParts {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            version: row.try_get("version")?,
            order_source: OrderSource::try_from(row.try_get::<i32, _>("order_source")?)?,
            loyalty_member_id: LoyaltyMemberId::from_uuid(
                row.try_get::<Uuid, _>("loyalty_member_id")?,
            ),
            status: Status::try_from(row.try_get::<i32, _>("order_status")?)?,
            location: Location::try_from(row.try_get::<i32, _>("location")?)?,
            line_items,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        }))
    }

    async fn insert_order(tx: &mut Transaction<'_, Postgres>, order: &Order) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_source, loyalty_member_id, order_status, location, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.order_source().code())
        .bind(order.loyalty_member_id().as_uuid())
        .bind(order.status().code())
        .bind(order.location().code())
        .bind(order.version())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut **tx)
        .await?;

        for (position, item) in order.line_items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO line_items (id, order_id, position, item_type, name, price_cents, item_status, is_barista_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(item.item_type.code())
            .bind(&item.name)
            .bind(item.price.cents())
            .bind(item.status.code())
            .bind(item.is_barista_line)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    async fn load(&self, id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let line_items = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE order_id = $1 ORDER BY position ASC"
        ))
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::row_to_line_item)
        .collect::<Result<Vec<_>>>()?;

        Self::row_to_order(&row, line_items).map(Some)
    }

    async fn load_all(&self) -> Result<Vec<Order>> {
        let order_rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items ORDER BY order_id ASC, position ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<LineItem>> = HashMap::new();
        for row in &item_rows {
            let item = Self::row_to_line_item(row)?;
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        order_rows
            .iter()
            .map(|row| -> Result<Order> {
                let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
                let items = items_by_order.remove(&id).unwrap_or_default();
                Self::row_to_order(row, items)
            })
            .collect()
    }

    /// Writes status changes if the stored version still matches.
    async fn write_update(&self, order: &Order) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $1, updated_at = $2, version = version + 1
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(order.status().code())
        .bind(order.updated_at())
        .bind(order.id().as_uuid())
        .bind(order.version())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                    .bind(order.id().as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return Ok(match actual {
                Some(actual) => WriteOutcome::Stale(actual),
                None => WriteOutcome::Missing,
            });
        }

        for item in order.line_items() {
            sqlx::query("UPDATE line_items SET item_status = $1 WHERE id = $2 AND order_id = $3")
                .bind(item.status.code())
                .bind(item.id.as_uuid())
                .bind(order.id().as_uuid())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(WriteOutcome::Written(order.version() + 1))
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create(&self, order: &Order) -> std::result::Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        Self::insert_order(&mut tx, order)
            .await
            .map_err(|e| insert_error(e, "order", order.id().to_string()))?;

        tx.commit().await.map_err(StoreError::from)?;
        tracing::debug!(order_id = %order.id(), "Order row inserted");
        Ok(())
    }

    async fn get_by_id(&self, id: OrderId) -> std::result::Result<Order, RepositoryError> {
        self.load(id)
            .await?
            .ok_or_else(|| RepositoryError::order_not_found(id))
    }

    async fn update(&self, order: &Order) -> std::result::Result<Order, RepositoryError> {
        match self.write_update(order).await? {
            WriteOutcome::Written(version) => {
                let mut updated = order.clone();
                updated.set_version(version);
                Ok(updated)
            }
            WriteOutcome::Stale(actual) => Err(RepositoryError::Conflict {
                order_id: order.id(),
                expected: order.version(),
                actual,
            }),
            WriteOutcome::Missing => Err(RepositoryError::order_not_found(order.id())),
        }
    }

    async fn get_all(&self) -> std::result::Result<Vec<Order>, RepositoryError> {
        Ok(self.load_all().await?)
    }
}
