//! CSV export of an owner's expenses, streamed straight from the database cursor.
use std::io;

use anyhow::anyhow;
use bytes::Bytes;
use serde::Deserialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tracing::{debug, instrument, warn};

use crate::{
    db::decode_timestamp,
    error::{AppError, AppResult},
};

pub const CSV_HEADER: [&str; 5] = ["ID", "Name", "Category", "Price", "Created At"];
pub const EXPORT_FILENAME: &str = "expenses_report.csv";

const MISSING_TIMESTAMP: &str = "null";
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Inclusive calendar-day bounds and an exact category name, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilter {
    pub category: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

fn parse_day(field: &'static str, raw: &str) -> AppResult<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid(field, "Date must be formatted as YYYY-MM-DD"))
}

impl TryFrom<ExportQuery> for ExportFilter {
    type Error = AppError;

    fn try_from(q: ExportQuery) -> AppResult<Self> {
        if q.category.as_deref().is_some_and(str::is_empty) {
            return Err(AppError::invalid("category", "Category must not be empty"));
        }
        Ok(ExportFilter {
            category: q.category,
            start_date: q
                .start_date
                .as_deref()
                .map(|d| parse_day("start_date", d))
                .transpose()?,
            end_date: q
                .end_date
                .as_deref()
                .map(|d| parse_day("end_date", d))
                .transpose()?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ExportRow {
    id: i64,
    name: String,
    category_name: String,
    price: i64,
    created_at: Option<String>,
}

fn export_query(owner_id: i64, filter: &ExportFilter) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT e.id, e.name, c.name AS category_name, e.price, e.created_at \
         FROM expenses e JOIN categories c ON c.id = e.category_id \
         WHERE e.user_id = ",
    );
    qb.push_bind(owner_id);
    if let Some(category) = &filter.category {
        qb.push(" AND c.name = ").push_bind(category.clone());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND date(e.created_at) >= ").push_bind(start.to_string());
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND date(e.created_at) <= ").push_bind(end.to_string());
    }
    qb.push(" ORDER BY e.id");
    qb
}

fn encode_record<I, T>(record: I) -> anyhow::Result<Bytes>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(record)?;
    let buf = writer.into_inner().map_err(|e| anyhow!(e.to_string()))?;
    Ok(Bytes::from(buf))
}

fn encode_row(row: &ExportRow) -> anyhow::Result<Bytes> {
    let created_at = match &row.created_at {
        Some(text) => decode_timestamp(text)?.format(&Rfc3339)?,
        None => MISSING_TIMESTAMP.to_owned(),
    };
    encode_record([
        row.id.to_string(),
        row.name.clone(),
        row.category_name.clone(),
        row.price.to_string(),
        created_at,
    ])
}

fn stream_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::other(err.to_string())
}

/// Start the export and wait for its first row.
///
/// The query runs in a spawned task that feeds a bounded channel; the returned
/// stream yields the header, then one encoded line per row as the consumer
/// pulls. Finding no rows is reported as [AppError::NoDataFound] before any
/// byte is produced. Dropping the stream stops the task and frees its connection.
#[instrument(skip(db))]
pub async fn export_csv(
    db: SqlitePool,
    owner_id: i64,
    filter: ExportFilter,
) -> AppResult<impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static> {
    let (tx, mut rx) = mpsc::channel::<Result<ExportRow, sqlx::Error>>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut qb = export_query(owner_id, &filter);
        let mut rows = qb.build_query_as::<ExportRow>().fetch(&db);
        let mut sent = 0usize;
        while let Some(row) = rows.next().await {
            let failed = row.is_err();
            if tx.send(row).await.is_err() {
                debug!(sent, "export consumer went away");
                return;
            }
            if failed {
                return;
            }
            sent += 1;
        }
        debug!(sent, "export finished");
    });

    let first = match rx.recv().await {
        Some(Ok(row)) => row,
        Some(Err(e)) => return Err(AppError::Database(e)),
        None => return Err(AppError::NoDataFound),
    };

    let head = [encode_record(CSV_HEADER)?, encode_row(&first)?];
    let rest = ReceiverStream::new(rx).map(|row| {
        let row = row.map_err(|e| {
            warn!(error = %e, "export aborted by database error");
            stream_error(e)
        })?;
        encode_row(&row).map_err(stream_error)
    });

    Ok(tokio_stream::iter(head.map(Ok::<Bytes, io::Error>)).chain(rest))
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;
    use crate::test_utils::{insert_category, insert_expense, insert_user, test_pool};

    async fn collect(stream: impl Stream<Item = Result<Bytes, io::Error>>) -> String {
        let chunks: Vec<Bytes> = stream
            .collect::<Result<Vec<_>, _>>()
            .await
            .unwrap();
        String::from_utf8(chunks.concat()).unwrap()
    }

    async fn seeded() -> (SqlitePool, i64) {
        let db = test_pool().await;
        let user = insert_user(&db, "x@example.com").await;
        let other = insert_user(&db, "y@example.com").await;
        let food = insert_category(&db, "Food").await;
        let fun = insert_category(&db, "Fun, Games").await;
        insert_expense(&db, user, food, "bread", 300, "2024-01-05T08:00:00.000Z").await;
        insert_expense(&db, user, fun, "board \"game\"", 4_500, "2024-01-31T23:59:59.999Z").await;
        insert_expense(&db, other, food, "not mine", 1, "2024-01-10T00:00:00.000Z").await;
        insert_expense(&db, user, food, "cheese", 900, "2024-02-01T00:00:00.000Z").await;
        (db, user)
    }

    #[test]
    fn filter_dates_are_validated() {
        let err = ExportFilter::try_from(ExportQuery {
            end_date: Some("31/01/2024".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some("end_date"), .. }));

        let ok = ExportFilter::try_from(ExportQuery {
            start_date: Some("2024-01-01".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ok.start_date, Some(date!(2024 - 01 - 01)));
    }

    #[test]
    fn missing_timestamp_is_written_as_null() {
        let row = ExportRow {
            id: 9,
            name: "n".into(),
            category_name: "c".into(),
            price: 1,
            created_at: None,
        };
        assert_eq!(encode_row(&row).unwrap(), Bytes::from_static(b"9,n,c,1,null\r\n"));
    }

    #[tokio::test]
    async fn export_round_trips_through_a_csv_reader() {
        let (db, user) = seeded().await;
        let text = collect(export_csv(db, user, ExportFilter::default()).await.unwrap()).await;

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), CSV_HEADER);
        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 3);

        assert_eq!(&records[1][0], "2");
        assert_eq!(&records[1][1], "board \"game\"");
        assert_eq!(&records[1][2], "Fun, Games");
        assert_eq!(&records[1][3], "4500");
        let at = time::OffsetDateTime::parse(&records[1][4], &Rfc3339).unwrap();
        assert_eq!(at, datetime!(2024-01-31 23:59:59.999 UTC));

        let ids: Vec<&str> = records.iter().map(|r| &r[0]).collect();
        assert_eq!(ids, ["1", "2", "4"]);
    }

    #[tokio::test]
    async fn date_bounds_include_whole_days() {
        let (db, user) = seeded().await;
        let filter = ExportFilter {
            start_date: Some(date!(2024 - 01 - 05)),
            end_date: Some(date!(2024 - 01 - 31)),
            ..Default::default()
        };
        let text = collect(export_csv(db, user, filter).await.unwrap()).await;
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let names: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[1].to_owned())
            .collect();
        assert_eq!(names, ["bread", "board \"game\""]);
    }

    #[tokio::test]
    async fn category_filter_and_empty_result() {
        let (db, user) = seeded().await;
        let filter = ExportFilter {
            category: Some("Food".into()),
            ..Default::default()
        };
        let text = collect(export_csv(db.clone(), user, filter).await.unwrap()).await;
        assert_eq!(text.lines().count(), 3);

        let nothing = ExportFilter {
            category: Some("Travel".into()),
            ..Default::default()
        };
        assert!(matches!(
            export_csv(db, user, nothing).await.err(),
            Some(AppError::NoDataFound)
        ));
    }
}
