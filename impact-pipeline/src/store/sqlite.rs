//! SQLite-backed record store.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use impact_metrics::{Activity, DerivedFields, GedsiMetric, User, Venture, Workflow, WorkflowRun};

use super::{schema, EntityKind, RecordFilter, RecordStore, StoreError};

const VENTURE_COLUMNS: &str = "id, name, sector, stage, location, funding_raised, team_size, \
     founder_types_json, inclusion_focus, operational_readiness_json, capital_readiness_json, \
     derived_json, calculated_at, created_at, updated_at";

const METRIC_COLUMNS: &str = "id, venture_id, code, name, category, target_value, current_value, \
     unit, status, due_date, created_at, updated_at";

const ACTIVITY_COLUMNS: &str =
    "id, venture_id, user_id, activity_type, title, description, metadata_json, created_at";

const RUN_COLUMNS: &str = "id, workflow_id, status, started_at, finished_at";

/// SQLite database holding every pipeline record.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }
}

/// Fixed-width RFC 3339 in UTC, e.g. `2024-03-02T09:00:00.000000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn label_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, Type::Text, e))
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, &raw)
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_timestamp(idx, &s)).transpose()
}

fn venture_from_row(row: &Row<'_>) -> rusqlite::Result<Venture> {
    let team_size: i64 = row.get(6)?;
    Ok(Venture {
        id: row.get(0)?,
        name: row.get(1)?,
        sector: row.get(2)?,
        stage: label_col(row, 3)?,
        location: row.get(4)?,
        funding_raised: row.get(5)?,
        team_size: u32::try_from(team_size).map_err(|e| conversion_error(6, Type::Integer, e))?,
        founder_types: json_col(row, 7)?,
        inclusion_focus: row.get(8)?,
        operational_readiness: json_col(row, 9)?,
        capital_readiness: json_col(row, 10)?,
        derived: json_col(row, 11)?,
        calculated_at: opt_ts_col(row, 12)?,
        created_at: ts_col(row, 13)?,
        updated_at: ts_col(row, 14)?,
    })
}

fn metric_from_row(row: &Row<'_>) -> rusqlite::Result<GedsiMetric> {
    Ok(GedsiMetric {
        id: row.get(0)?,
        venture_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        category: label_col(row, 4)?,
        target_value: row.get(5)?,
        current_value: row.get(6)?,
        unit: row.get(7)?,
        status: label_col(row, 8)?,
        due_date: opt_ts_col(row, 9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        venture_id: row.get(1)?,
        user_id: row.get(2)?,
        activity_type: label_col(row, 3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        metadata: json_col(row, 6)?,
        created_at: ts_col(row, 7)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<WorkflowRun> {
    Ok(WorkflowRun {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        status: label_col(row, 2)?,
        started_at: ts_col(row, 3)?,
        finished_at: opt_ts_col(row, 4)?,
    })
}

/// `WHERE` clause and its positional parameters for a filter.
fn where_clause(
    filter: &RecordFilter,
    venture_column: Option<&str>,
    time_column: &str,
) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if let (Some(column), Some(id)) = (venture_column, &filter.venture_id) {
        conditions.push(format!("{} = ?", column));
        params.push(id.clone());
    }
    if let Some(from) = filter.created_from {
        conditions.push(format!("{} >= ?", time_column));
        params.push(format_timestamp(from));
    }
    if let Some(until) = filter.created_until {
        conditions.push(format!("{} < ?", time_column));
        params.push(format_timestamp(until));
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }
}

/// Table, venture reference column and timestamp column of a collection.
fn table_of(kind: EntityKind) -> (&'static str, Option<&'static str>, &'static str) {
    match kind {
        EntityKind::Ventures => ("ventures", Some("id"), "created_at"),
        EntityKind::Metrics => ("gedsi_metrics", Some("venture_id"), "created_at"),
        EntityKind::Activities => ("activities", Some("venture_id"), "created_at"),
        EntityKind::Users => ("users", None, "created_at"),
        EntityKind::Workflows => ("workflows", None, "created_at"),
        EntityKind::WorkflowRuns => ("workflow_runs", None, "started_at"),
    }
}

fn list<T>(
    conn: &Connection,
    columns: &str,
    kind: EntityKind,
    filter: &RecordFilter,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, StoreError> {
    let (table, venture_column, time_column) = table_of(kind);
    let (clause, params) = where_clause(filter, venture_column, time_column);
    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} DESC",
        columns, table, clause, time_column
    );

    debug!("Executing query: {}", sql);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), map)?;
    let out = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(out)
}

fn get_by_id<T>(
    conn: &Connection,
    columns: &str,
    table: &str,
    id: &str,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>, StoreError> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", columns, table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![id], map)?;
    let first = rows.next().transpose()?;
    Ok(first)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn ventures(&self, filter: &RecordFilter) -> Result<Vec<Venture>, StoreError> {
        self.with_conn(|conn| {
            list(conn, VENTURE_COLUMNS, EntityKind::Ventures, filter, venture_from_row)
        })
    }

    async fn venture(&self, id: &str) -> Result<Option<Venture>, StoreError> {
        self.with_conn(|conn| get_by_id(conn, VENTURE_COLUMNS, "ventures", id, venture_from_row))
    }

    async fn insert_venture(&self, venture: &Venture) -> Result<(), StoreError> {
        let founder_types = serde_json::to_string(&venture.founder_types)?;
        let operational = serde_json::to_string(&venture.operational_readiness)?;
        let capital = serde_json::to_string(&venture.capital_readiness)?;
        let derived = serde_json::to_string(&venture.derived)?;

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO ventures ({}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    VENTURE_COLUMNS
                ),
                params![
                    venture.id,
                    venture.name,
                    venture.sector,
                    venture.stage.as_str(),
                    venture.location,
                    venture.funding_raised,
                    i64::from(venture.team_size),
                    founder_types,
                    venture.inclusion_focus,
                    operational,
                    capital,
                    derived,
                    venture.calculated_at.map(format_timestamp),
                    format_timestamp(venture.created_at),
                    format_timestamp(venture.updated_at),
                ],
            )?;
            debug!(venture_id = %venture.id, "Inserted venture");
            Ok(())
        })
    }

    async fn update_derived_fields(
        &self,
        id: &str,
        fields: &DerivedFields,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let derived = serde_json::to_string(fields)?;

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE ventures SET derived_json = ?1, calculated_at = ?2 WHERE id = ?3",
                params![derived, format_timestamp(at), id],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("venture", id));
            }
            Ok(())
        })
    }

    async fn metrics(&self, filter: &RecordFilter) -> Result<Vec<GedsiMetric>, StoreError> {
        self.with_conn(|conn| {
            list(conn, METRIC_COLUMNS, EntityKind::Metrics, filter, metric_from_row)
        })
    }

    async fn metric(&self, id: &str) -> Result<Option<GedsiMetric>, StoreError> {
        self.with_conn(|conn| get_by_id(conn, METRIC_COLUMNS, "gedsi_metrics", id, metric_from_row))
    }

    async fn insert_metric(&self, metric: &GedsiMetric) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO gedsi_metrics ({}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    METRIC_COLUMNS
                ),
                params![
                    metric.id,
                    metric.venture_id,
                    metric.code,
                    metric.name,
                    metric.category.as_str(),
                    metric.target_value,
                    metric.current_value,
                    metric.unit,
                    metric.status.as_str(),
                    metric.due_date.map(format_timestamp),
                    format_timestamp(metric.created_at),
                    format_timestamp(metric.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    async fn update_metric(&self, metric: &GedsiMetric) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE gedsi_metrics SET code = ?1, name = ?2, category = ?3, target_value = ?4, \
                 current_value = ?5, unit = ?6, status = ?7, due_date = ?8, updated_at = ?9 \
                 WHERE id = ?10",
                params![
                    metric.code,
                    metric.name,
                    metric.category.as_str(),
                    metric.target_value,
                    metric.current_value,
                    metric.unit,
                    metric.status.as_str(),
                    metric.due_date.map(format_timestamp),
                    format_timestamp(metric.updated_at),
                    metric.id,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("metric", &metric.id));
            }
            Ok(())
        })
    }

    async fn delete_metric(&self, id: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM gedsi_metrics WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(StoreError::not_found("metric", id));
            }
            Ok(())
        })
    }

    async fn activities(&self, filter: &RecordFilter) -> Result<Vec<Activity>, StoreError> {
        self.with_conn(|conn| {
            list(
                conn,
                ACTIVITY_COLUMNS,
                EntityKind::Activities,
                filter,
                activity_from_row,
            )
        })
    }

    async fn append_activity(&self, activity: &Activity) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&activity.metadata)?;

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO activities ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    ACTIVITY_COLUMNS
                ),
                params![
                    activity.id,
                    activity.venture_id,
                    activity.user_id,
                    activity.activity_type.as_str(),
                    activity.title,
                    activity.description,
                    metadata,
                    format_timestamp(activity.created_at),
                ],
            )?;
            Ok(())
        })
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id,
                    user.email,
                    user.name,
                    user.role,
                    format_timestamp(user.created_at)
                ],
            )?;
            Ok(())
        })
    }

    async fn insert_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflows (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![workflow.id, workflow.name, format_timestamp(workflow.created_at)],
            )?;
            Ok(())
        })
    }

    async fn insert_workflow_run(&self, run: &WorkflowRun) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO workflow_runs ({}) VALUES (?1, ?2, ?3, ?4, ?5)", RUN_COLUMNS),
                params![
                    run.id,
                    run.workflow_id,
                    run.status.as_str(),
                    format_timestamp(run.started_at),
                    run.finished_at.map(format_timestamp),
                ],
            )?;
            Ok(())
        })
    }

    async fn workflow_runs(&self, filter: &RecordFilter) -> Result<Vec<WorkflowRun>, StoreError> {
        self.with_conn(|conn| {
            list(conn, RUN_COLUMNS, EntityKind::WorkflowRuns, filter, run_from_row)
        })
    }

    async fn count(&self, kind: EntityKind, filter: &RecordFilter) -> Result<u64, StoreError> {
        let (table, venture_column, time_column) = table_of(kind);
        let (clause, params) = where_clause(filter, venture_column, time_column);
        let sql = format!("SELECT COUNT(*) FROM {}{}", table, clause);

        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use impact_metrics::{ActivityType, GedsiCategory, MetricStatus, RunStatus, VentureStage};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_timestamps_are_fixed_width() {
        let early = format_timestamp(at(2024, 1, 2));
        let later = format_timestamp(at(2024, 1, 2) + chrono::Duration::microseconds(5));
        assert_eq!(early, "2024-01-02T09:00:00.000000Z");
        assert_eq!(early.len(), later.len());
        assert!(early < later);
    }

    #[tokio::test]
    async fn test_venture_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let venture = Venture::new("SolarKiosk", "Energy")
            .with_stage(VentureStage::Screening)
            .with_founder_types(["women-led", "rural-focus"])
            .with_inclusion_focus("rural women")
            .with_operational("businessPlan", true)
            .with_capital("pitchDeck", false)
            .created(at(2024, 3, 1));

        store.insert_venture(&venture).await.unwrap();

        let loaded = store.venture(&venture.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "SolarKiosk");
        assert_eq!(loaded.stage, VentureStage::Screening);
        assert_eq!(loaded.founder_types, vec!["women-led", "rural-focus"]);
        assert_eq!(loaded.operational_readiness.get("businessPlan"), Some(&true));
        assert_eq!(loaded.capital_readiness.get("pitchDeck"), Some(&false));
        assert_eq!(loaded.created_at, at(2024, 3, 1));
        assert!(loaded.calculated_at.is_none());

        assert!(store.venture("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_derived_fields() {
        let store = SqliteStore::open_in_memory().unwrap();
        let venture = Venture::new("Acme", "Retail");
        store.insert_venture(&venture).await.unwrap();

        let fields = DerivedFields {
            gedsi_score: 56,
            total_beneficiaries: 182,
            ..Default::default()
        };
        store
            .update_derived_fields(&venture.id, &fields, at(2024, 5, 1))
            .await
            .unwrap();

        let loaded = store.venture(&venture.id).await.unwrap().unwrap();
        assert_eq!(loaded.derived, fields);
        assert_eq!(loaded.calculated_at, Some(at(2024, 5, 1)));

        let missing = store.update_derived_fields("nope", &fields, at(2024, 5, 1)).await;
        assert!(matches!(missing, Err(StoreError::NotFound { entity: "venture", .. })));
    }

    #[tokio::test]
    async fn test_metric_crud_and_filters() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = Venture::new("A", "Retail");
        let b = Venture::new("B", "Retail");
        store.insert_venture(&a).await.unwrap();
        store.insert_venture(&b).await.unwrap();

        let mut metric = GedsiMetric::new(&a.id, "OI.1", "Women reached", GedsiCategory::Gender)
            .with_values(100.0, 40.0)
            .with_due_date(at(2024, 12, 31))
            .created(at(2024, 2, 1));
        store.insert_metric(&metric).await.unwrap();
        store
            .insert_metric(
                &GedsiMetric::new(&b.id, "OI.2", "PwD reached", GedsiCategory::Disability)
                    .created(at(2024, 4, 1)),
            )
            .await
            .unwrap();

        assert_eq!(store.metrics(&RecordFilter::for_venture(&a.id)).await.unwrap().len(), 1);
        assert_eq!(store.metrics(&RecordFilter::since(at(2024, 3, 1))).await.unwrap().len(), 1);
        let january = RecordFilter::between(at(2024, 1, 1), at(2024, 2, 1));
        assert_eq!(store.metrics(&january).await.unwrap().len(), 0);

        metric.status = MetricStatus::Verified;
        metric.current_value = 100.0;
        store.update_metric(&metric).await.unwrap();
        let loaded = store.metric(&metric.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MetricStatus::Verified);
        assert_eq!(loaded.due_date, Some(at(2024, 12, 31)));

        store.delete_metric(&metric.id).await.unwrap();
        assert!(store.metric(&metric.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_metric(&metric.id).await,
            Err(StoreError::NotFound { entity: "metric", .. })
        ));
    }

    #[tokio::test]
    async fn test_counts_by_kind() {
        let store = SqliteStore::open_in_memory().unwrap();
        let venture = Venture::new("Acme", "Retail").created(at(2024, 1, 10));
        store.insert_venture(&venture).await.unwrap();
        store
            .append_activity(
                &Activity::new(ActivityType::Note, "Call with founder")
                    .for_venture(&venture.id)
                    .with_metadata(serde_json::json!({"channel": "phone"})),
            )
            .await
            .unwrap();
        store.insert_user(&User::new("ana@example.org", "Ana", "analyst")).await.unwrap();

        let workflow = Workflow::new("Monthly report");
        store.insert_workflow(&workflow).await.unwrap();
        for status in [RunStatus::Succeeded, RunStatus::Failed] {
            store
                .insert_workflow_run(&WorkflowRun::new(&workflow.id, status, at(2024, 1, 15)))
                .await
                .unwrap();
        }

        let all = RecordFilter::all();
        assert_eq!(store.count(EntityKind::Ventures, &all).await.unwrap(), 1);
        assert_eq!(store.count(EntityKind::Activities, &all).await.unwrap(), 1);
        assert_eq!(store.count(EntityKind::Users, &all).await.unwrap(), 1);
        assert_eq!(store.count(EntityKind::Workflows, &all).await.unwrap(), 1);
        assert_eq!(store.count(EntityKind::WorkflowRuns, &all).await.unwrap(), 2);
        assert_eq!(
            store.count(EntityKind::Ventures, &RecordFilter::since(at(2024, 2, 1))).await.unwrap(),
            0
        );

        let activities = store.activities(&RecordFilter::for_venture(&venture.id)).await.unwrap();
        assert_eq!(activities[0].metadata["channel"], "phone");

        let runs = store.workflow_runs(&RecordFilter::since(at(2024, 1, 1))).await.unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pipeline.db");

        let venture = Venture::new("Acme", "Retail");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_venture(&venture).await.unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.venture(&venture.id).await.unwrap().is_some());
    }
}
