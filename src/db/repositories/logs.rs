use crate::entities::{logs, prelude::*};
use crate::models::log::NewLog;
use anyhow::Result;
use chrono::Utc;
use sea_orm::entity::prelude::DateTimeUtc;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;

/// Typed predicates for the list and stats queries. Present fields are ANDed
/// together; each maps to one parameterized condition, never to assembled SQL
/// text.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub level: Option<String>,
    pub resource_id: Option<String>,
    pub trace_id: Option<String>,
    pub commit: Option<String>,
    pub start: Option<DateTimeUtc>,
    pub end: Option<DateTimeUtc>,
    pub search: Option<String>,
}

impl LogFilter {
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(level) = &self.level {
            condition = condition.add(logs::Column::Level.eq(level.clone()));
        }
        if let Some(resource_id) = &self.resource_id {
            condition = condition.add(logs::Column::ResourceId.eq(resource_id.clone()));
        }
        if let Some(trace_id) = &self.trace_id {
            condition = condition.add(logs::Column::TraceId.eq(trace_id.clone()));
        }
        if let Some(commit) = &self.commit {
            condition = condition.add(logs::Column::Commit.eq(commit.clone()));
        }
        if let Some(start) = self.start {
            condition = condition.add(logs::Column::Timestamp.gte(start));
        }
        if let Some(end) = self.end {
            condition = condition.add(logs::Column::Timestamp.lte(end));
        }
        if let Some(term) = &self.search {
            condition = condition.add(
                Condition::any()
                    .add(logs::Column::Message.contains(term.as_str()))
                    .add(logs::Column::ResourceId.contains(term.as_str())),
            );
        }

        condition
    }
}

/// One `{level, count}` group of the stats aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelCount {
    pub level: String,
    pub count: i64,
}

pub struct LogRepository {
    conn: DatabaseConnection,
}

impl LogRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, log: NewLog) -> Result<logs::Model> {
        let model = Logs::insert(active_model(log))
            .exec_with_returning(&self.conn)
            .await?;
        Ok(model)
    }

    /// Inserts a batch inside a single transaction. Any failure rolls back
    /// every insert of the batch.
    pub async fn insert_batch(&self, batch: Vec<NewLog>) -> Result<Vec<logs::Model>> {
        let txn = self.conn.begin().await?;

        let mut inserted = Vec::with_capacity(batch.len());
        for log in batch {
            let model = Logs::insert(active_model(log))
                .exec_with_returning(&txn)
                .await?;
            inserted.push(model);
        }

        txn.commit().await?;
        Ok(inserted)
    }

    /// Returns one page ordered by event time descending, plus the total
    /// match count ignoring pagination. A page past the end is empty.
    pub async fn query(
        &self,
        filter: &LogFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<logs::Model>, u64)> {
        let paginator = Logs::find()
            .filter(filter.condition())
            .order_by_desc(logs::Column::Timestamp)
            .paginate(&self.conn, limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    /// Count-by-level over the filtered set, largest group first. Only the
    /// date range predicates are expected in the filter here.
    pub async fn stats(&self, filter: &LogFilter) -> Result<Vec<LevelCount>> {
        let mut groups: Vec<(String, i64)> = Logs::find()
            .select_only()
            .column(logs::Column::Level)
            .column_as(logs::Column::Id.count(), "count")
            .filter(filter.condition())
            .group_by(logs::Column::Level)
            .into_tuple()
            .all(&self.conn)
            .await?;

        groups.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(groups
            .into_iter()
            .map(|(level, count)| LevelCount { level, count })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<logs::Model>> {
        Ok(Logs::find_by_id(id).one(&self.conn).await?)
    }
}

fn active_model(log: NewLog) -> logs::ActiveModel {
    logs::ActiveModel {
        level: Set(log.level),
        message: Set(log.message),
        resource_id: Set(log.resource_id),
        timestamp: Set(log.timestamp),
        trace_id: Set(log.trace_id),
        span_id: Set(log.span_id),
        commit: Set(log.commit),
        metadata: Set(log.metadata),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
}
