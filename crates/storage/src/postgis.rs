//! PostGIS store backend.
//!
//! Grid points live in one `grid_points` table keyed by dataset name, with
//! a `geography(Point)` location and a JSONB map of encoded values. Spatial
//! indexes are partial GiST indexes, one per dataset.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};

use atlas_common::{DatasetMetadata, EncodedValue, GridPoint, LonLat, Polygon};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{GeoStore, NearQuery, Neighbor, StoreSession};

/// Geospatial store on PostgreSQL + PostGIS.
pub struct PostgisStore {
    pool: PgPool,
    max_connections: u32,
}

impl PostgisStore {
    /// Connect a pool to the configured database.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Connection failed: {}", e)))?;

        Ok(Self {
            pool,
            max_connections: config.max_connections,
        })
    }

    /// Create tables if they do not exist.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(&self.pool).await?;
            }
        }
        Ok(())
    }
}

/// A session owning one pooled connection.
pub struct PostgisSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl StoreSession for PostgisSession {
    async fn insert_many(&mut self, dataset: &str, documents: &[GridPoint]) -> StoreResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO grid_points (dataset, location, doc_values) ");
        builder.push_values(documents, |mut row, doc| {
            row.push_bind(dataset.to_string())
                .push("ST_SetSRID(ST_MakePoint(")
                .push_bind_unseparated(doc.location.lon)
                .push_unseparated(", ")
                .push_bind_unseparated(doc.location.lat)
                .push_unseparated("), 4326)::geography")
                .push_bind(Json(doc.values.clone()));
        });

        let result = builder.build().execute(&mut *self.conn).await?;
        debug!(dataset = %dataset, rows = result.rows_affected(), "Inserted batch");
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl GeoStore for PostgisStore {
    async fn session(&self) -> StoreResult<Box<dyn StoreSession>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PostgisSession { conn }))
    }

    fn max_sessions(&self) -> Option<usize> {
        Some(self.max_connections as usize)
    }

    #[instrument(skip(self, metadata), fields(dataset = %metadata.name))]
    async fn replace_metadata(&self, metadata: &DatasetMetadata) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM grid_meta WHERE name = $1")
            .bind(&metadata.name)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO grid_meta (name, document) VALUES ($1, $2)")
            .bind(&metadata.name)
            .bind(Json(metadata))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn metadata(&self, name: &str) -> StoreResult<Option<DatasetMetadata>> {
        let row = sqlx::query_scalar::<_, Json<DatasetMetadata>>(
            "SELECT document FROM grid_meta WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(meta)| meta))
    }

    #[instrument(skip(self))]
    async fn create_spatial_index(&self, dataset: &str) -> StoreResult<()> {
        // DDL cannot take bind parameters; the name is sanitised and the
        // literal escaped instead.
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON grid_points USING GIST (location) WHERE dataset = '{}'",
            index_name(dataset),
            dataset.replace('\'', "''"),
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        info!(index = %index_name(dataset), "Spatial index ready");
        Ok(())
    }

    async fn intersecting(
        &self,
        dataset: &str,
        polygon: &Polygon,
        variable: &str,
    ) -> StoreResult<Vec<GridPoint>> {
        let coordinates: Vec<[f64; 2]> = polygon.ring().iter().map(|p| (*p).into()).collect();
        let geojson = serde_json::to_string(&serde_json::json!({
            "type": "Polygon",
            "coordinates": [coordinates],
        }))?;

        let rows = sqlx::query_as::<_, (f64, f64, Option<Json<EncodedValue>>)>(
            "SELECT ST_X(location::geometry), ST_Y(location::geometry), doc_values -> $3 \
             FROM grid_points \
             WHERE dataset = $1 \
             AND ST_Intersects(location, ST_SetSRID(ST_GeomFromGeoJSON($2), 4326)::geography)",
        )
        .bind(dataset)
        .bind(geojson)
        .bind(variable)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(lon, lat, value)| projected_point(lon, lat, variable, value))
            .collect())
    }

    async fn nearest(&self, dataset: &str, query: &NearQuery) -> StoreResult<Vec<Neighbor>> {
        let rows = sqlx::query_as::<_, (f64, f64, Option<Json<EncodedValue>>, f64)>(
            "SELECT ST_X(location::geometry), ST_Y(location::geometry), doc_values -> $4, \
             ST_Distance(location, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography) AS distance \
             FROM grid_points \
             WHERE dataset = $1 \
             AND ST_DWithin(location, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography, $5) \
             ORDER BY distance ASC \
             LIMIT $6",
        )
        .bind(dataset)
        .bind(query.point.lon)
        .bind(query.point.lat)
        .bind(&query.variable)
        .bind(query.max_distance)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(lon, lat, value, distance)| Neighbor {
                point: projected_point(lon, lat, &query.variable, value),
                distance,
            })
            .collect())
    }
}

fn projected_point(
    lon: f64,
    lat: f64,
    variable: &str,
    value: Option<Json<EncodedValue>>,
) -> GridPoint {
    let mut values = BTreeMap::new();
    if let Some(Json(value)) = value {
        values.insert(variable.to_string(), value);
    }
    GridPoint {
        location: LonLat::new(lon, lat),
        values,
    }
}

/// Longest dataset slug kept in an index name.
const INDEX_SLUG_LEN: usize = 40;

/// Index name for `dataset`, unique per dataset and within the 63-byte
/// identifier limit.
fn index_name(dataset: &str) -> String {
    let slug: String = dataset
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .take(INDEX_SLUG_LEN)
        .collect();
    format!("idx_gp_{}_{:08x}", slug, crc32fast::hash(dataset.as_bytes()))
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE EXTENSION IF NOT EXISTS postgis;

CREATE TABLE IF NOT EXISTS grid_points (
    id BIGSERIAL PRIMARY KEY,
    dataset VARCHAR(200) NOT NULL,
    location GEOGRAPHY(POINT, 4326) NOT NULL,
    doc_values JSONB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_grid_points_dataset ON grid_points(dataset);

CREATE TABLE IF NOT EXISTS grid_meta (
    name VARCHAR(200) PRIMARY KEY,
    document JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;
