//! # Report Queries
//!
//! Read-only aggregations across loans, clients and tools. Every query takes
//! an optional start-date window; `None` means all time.

use sqlx::SqliteConnection;

use crate::error::DbResult;
use toolshed_core::{Client, DateRange, Loan, ToolLoanCount};

#[derive(Debug, Clone, Copy)]
pub struct ReportRepository;

/// Splits an optional range into the two bind values the queries expect.
/// A NULL start disables the date filter.
fn bounds(range: Option<DateRange>) -> (Option<chrono::NaiveDate>, Option<chrono::NaiveDate>) {
    match range {
        Some(r) => (Some(r.start), Some(r.end)),
        None => (None, None),
    }
}

impl ReportRepository {
    /// Open (ACTIVE or LATE) loans, oldest due date first.
    pub async fn open_loans(
        conn: &mut SqliteConnection,
        range: Option<DateRange>,
    ) -> DbResult<Vec<Loan>> {
        let (start, end) = bounds(range);

        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, client_id, tool_id, start_date, due_date, return_date,
                   status, total_charge, created_at, updated_at
            FROM loans
            WHERE status IN ('active', 'late')
              AND (?1 IS NULL OR start_date BETWEEN ?1 AND ?2)
            ORDER BY due_date, start_date
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;

        Ok(loans)
    }

    /// Distinct clients holding at least one LATE loan, ordered by name.
    pub async fn late_clients(
        conn: &mut SqliteConnection,
        range: Option<DateRange>,
    ) -> DbResult<Vec<Client>> {
        let (start, end) = bounds(range);

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT DISTINCT c.id, c.rut, c.name, c.phone, c.email, c.status,
                   c.created_at, c.updated_at, c.version
            FROM clients c
            JOIN loans l ON l.client_id = c.id
            WHERE l.status = 'late'
              AND (?1 IS NULL OR l.start_date BETWEEN ?1 AND ?2)
            ORDER BY c.name, c.rut
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&mut *conn)
        .await?;

        Ok(clients)
    }

    /// Tools ranked by number of loans, ties broken by name.
    pub async fn most_borrowed_tools(
        conn: &mut SqliteConnection,
        range: Option<DateRange>,
        limit: i64,
    ) -> DbResult<Vec<ToolLoanCount>> {
        let (start, end) = bounds(range);

        let rows = sqlx::query_as::<_, ToolLoanCount>(
            r#"
            SELECT t.id AS tool_id,
                   t.name AS tool_name,
                   t.category AS category,
                   COUNT(l.id) AS loan_count
            FROM loans l
            JOIN tools t ON t.id = l.tool_id
            WHERE (?1 IS NULL OR l.start_date BETWEEN ?1 AND ?2)
            GROUP BY t.id, t.name, t.category
            ORDER BY loan_count DESC, t.name
            LIMIT ?3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ClientRepository, LoanRepository, ToolRepository};
    use crate::{Database, DbConfig};
    use chrono::{NaiveDate, Utc};
    use toolshed_core::{LoanStatus, Money, NewClient, NewTool, Tool};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn tool(conn: &mut SqliteConnection, name: &str) -> Tool {
        let tool = Tool::register(
            NewTool {
                name: name.to_string(),
                category: "Manual".to_string(),
                replacement_value: Money::new(10000),
                stock: 5,
            },
            Utc::now(),
        );
        ToolRepository::insert(conn, &tool).await.unwrap();
        tool
    }

    async fn client(conn: &mut SqliteConnection, rut: &str, name: &str) -> Client {
        let client = Client::register(
            NewClient {
                rut: rut.to_string(),
                name: name.to_string(),
                phone: "+56900000000".to_string(),
                email: "x@example.com".to_string(),
            },
            rut.to_string(),
            Utc::now(),
        );
        ClientRepository::insert(conn, &client).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_reports_respect_range_and_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let hammer = tool(&mut conn, "Martillo").await;
        let saw = tool(&mut conn, "Serrucho").await;
        let ana = client(&mut conn, "11111111-1", "Ana").await;
        let bruno = client(&mut conn, "22222222-2", "Bruno").await;

        let march = Loan::open(&ana.id, &hammer.id, date(2025, 3, 1), date(2025, 3, 3), Utc::now());
        let april = Loan::open(&ana.id, &saw.id, date(2025, 4, 1), date(2025, 4, 3), Utc::now());
        let bruno_march =
            Loan::open(&bruno.id, &hammer.id, date(2025, 3, 10), date(2025, 3, 12), Utc::now());
        for loan in [&march, &april, &bruno_march] {
            LoanRepository::insert(&mut conn, loan).await.unwrap();
        }

        // March loans of Ana go late; Bruno's stays active
        LoanRepository::mark_overdue(&mut conn, date(2025, 3, 5), Utc::now())
            .await
            .unwrap();

        let all_open = ReportRepository::open_loans(&mut conn, None).await.unwrap();
        assert_eq!(all_open.len(), 3);

        let march_range = DateRange::new(date(2025, 3, 1), date(2025, 3, 31)).unwrap();
        let march_open = ReportRepository::open_loans(&mut conn, Some(march_range))
            .await
            .unwrap();
        assert_eq!(march_open.len(), 2);

        let late = ReportRepository::late_clients(&mut conn, None).await.unwrap();
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].id, ana.id);

        let ranking = ReportRepository::most_borrowed_tools(&mut conn, None, 10)
            .await
            .unwrap();
        assert_eq!(ranking[0].tool_name, "Martillo");
        assert_eq!(ranking[0].loan_count, 2);
        assert_eq!(ranking[1].loan_count, 1);

        let top_one = ReportRepository::most_borrowed_tools(&mut conn, Some(march_range), 1)
            .await
            .unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].tool_id, hammer.id);

        let late_loans = LoanRepository::list_by_status(&mut conn, LoanStatus::Late)
            .await
            .unwrap();
        assert_eq!(late_loans.len(), 1);
    }
}
