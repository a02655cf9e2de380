//! # Loan Repository
//!
//! Persistence for loans.
//!
//! ## Close Guard
//! ```text
//! UPDATE loans SET status = 'closed', ...
//! WHERE id = ? AND status IN ('active', 'late')
//!        │
//!        ├── 1 row  → this transaction closed the loan
//!        └── 0 rows → somebody else closed it first
//! ```
//! Two concurrent returns of the same loan can both read it as open, but
//! only one of them gets a row back from the guarded update.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use toolshed_core::{Loan, LoanStatus, Money};

#[derive(Debug, Clone, Copy)]
pub struct LoanRepository;

impl LoanRepository {
    pub async fn insert(conn: &mut SqliteConnection, loan: &Loan) -> DbResult<()> {
        debug!(
            loan_id = %loan.id,
            client_id = %loan.client_id,
            tool_id = %loan.tool_id,
            "Inserting loan"
        );

        sqlx::query(
            r#"
            INSERT INTO loans (
                id, client_id, tool_id, start_date, due_date, return_date,
                status, total_charge, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.client_id)
        .bind(&loan.tool_id)
        .bind(loan.start_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.status)
        .bind(loan.total_charge)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, client_id, tool_id, start_date, due_date, return_date,
                   status, total_charge, created_at, updated_at
            FROM loans
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(loan)
    }

    /// Every loan, newest start date first.
    pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, client_id, tool_id, start_date, due_date, return_date,
                   status, total_charge, created_at, updated_at
            FROM loans
            ORDER BY start_date DESC, created_at DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(loans)
    }

    pub async fn list_by_client(
        conn: &mut SqliteConnection,
        client_id: &str,
    ) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, client_id, tool_id, start_date, due_date, return_date,
                   status, total_charge, created_at, updated_at
            FROM loans
            WHERE client_id = ?1
            ORDER BY start_date DESC, created_at DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(loans)
    }

    pub async fn list_by_status(
        conn: &mut SqliteConnection,
        status: LoanStatus,
    ) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, client_id, tool_id, start_date, due_date, return_date,
                   status, total_charge, created_at, updated_at
            FROM loans
            WHERE status = ?1
            ORDER BY start_date DESC, created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;

        Ok(loans)
    }

    /// Counts ACTIVE and LATE loans held by a client.
    pub async fn count_open_for_client(
        conn: &mut SqliteConnection,
        client_id: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE client_id = ?1 AND status IN ('active', 'late')",
        )
        .bind(client_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// True if the client already holds an open loan of this tool.
    pub async fn has_open_loan_for_tool(
        conn: &mut SqliteConnection,
        client_id: &str,
        tool_id: &str,
    ) -> DbResult<bool> {
        let exists: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM loans
                WHERE client_id = ?1 AND tool_id = ?2 AND status IN ('active', 'late')
            )
            "#,
        )
        .bind(client_id)
        .bind(tool_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists != 0)
    }

    /// Counts LATE loans held by a client.
    pub async fn count_late_for_client(
        conn: &mut SqliteConnection,
        client_id: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE client_id = ?1 AND status = 'late'",
        )
        .bind(client_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Counts CLOSED loans of a client that still carry a charge.
    pub async fn count_unpaid_closed_for_client(
        conn: &mut SqliteConnection,
        client_id: &str,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM loans
            WHERE client_id = ?1 AND status = 'closed' AND total_charge > 0
            "#,
        )
        .bind(client_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Closes an open loan with its return date and charge.
    ///
    /// ## Returns
    /// * `Ok(true)` - the loan was open and is now CLOSED
    /// * `Ok(false)` - the loan was already closed (or does not exist)
    pub async fn close(conn: &mut SqliteConnection, loan: &Loan) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET return_date = ?1,
                status = 'closed',
                total_charge = ?2,
                updated_at = ?3
            WHERE id = ?4 AND status IN ('active', 'late')
            "#,
        )
        .bind(loan.return_date)
        .bind(loan.total_charge)
        .bind(loan.updated_at)
        .bind(&loan.id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Overwrites the charge of a loan.
    pub async fn set_total_charge(
        conn: &mut SqliteConnection,
        loan_id: &str,
        total_charge: Money,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE loans SET total_charge = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(total_charge)
        .bind(now)
        .bind(loan_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Loan", loan_id));
        }

        Ok(())
    }

    /// Flags ACTIVE loans whose due date is before `as_of` as LATE.
    ///
    /// ## Returns
    /// Number of loans that changed status.
    pub async fn mark_overdue(
        conn: &mut SqliteConnection,
        as_of: NaiveDate,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = 'late', updated_at = ?1
            WHERE status = 'active' AND due_date < ?2
            "#,
        )
        .bind(now)
        .bind(as_of)
        .execute(&mut *conn)
        .await?;

        let changed = result.rows_affected();
        if changed > 0 {
            info!(count = changed, as_of = %as_of, "Loans marked late");
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ClientRepository, ToolRepository};
    use crate::{Database, DbConfig};
    use toolshed_core::{Client, NewClient, NewTool, Tool};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seed(conn: &mut SqliteConnection) -> (Client, Tool) {
        let now = Utc::now();
        let client = Client::register(
            NewClient {
                rut: "44444444-4".to_string(),
                name: "Ana Rojas".to_string(),
                phone: "+56911112222".to_string(),
                email: "ana@example.com".to_string(),
            },
            "44444444-4".to_string(),
            now,
        );
        let tool = Tool::register(
            NewTool {
                name: "Taladro".to_string(),
                category: "Electric".to_string(),
                replacement_value: Money::new(30000),
                stock: 3,
            },
            now,
        );
        ClientRepository::insert(conn, &client).await.unwrap();
        ToolRepository::insert(conn, &tool).await.unwrap();
        (client, tool)
    }

    #[tokio::test]
    async fn test_open_loan_counters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let (client, tool) = seed(&mut conn).await;

        let loan = Loan::open(&client.id, &tool.id, date(2025, 3, 1), date(2025, 3, 5), Utc::now());
        LoanRepository::insert(&mut conn, &loan).await.unwrap();

        assert_eq!(
            LoanRepository::count_open_for_client(&mut conn, &client.id)
                .await
                .unwrap(),
            1
        );
        assert!(LoanRepository::has_open_loan_for_tool(&mut conn, &client.id, &tool.id)
            .await
            .unwrap());
        assert!(!LoanRepository::has_open_loan_for_tool(&mut conn, &client.id, "other")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_close_only_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let (client, tool) = seed(&mut conn).await;

        let mut loan =
            Loan::open(&client.id, &tool.id, date(2025, 3, 1), date(2025, 3, 5), Utc::now());
        LoanRepository::insert(&mut conn, &loan).await.unwrap();

        loan.return_date = Some(date(2025, 3, 5));
        loan.total_charge = Money::new(20000);
        assert!(LoanRepository::close(&mut conn, &loan).await.unwrap());
        assert!(!LoanRepository::close(&mut conn, &loan).await.unwrap());

        let stored = LoanRepository::get_by_id(&mut conn, &loan.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, LoanStatus::Closed);
        assert_eq!(stored.return_date, Some(date(2025, 3, 5)));
        assert_eq!(
            LoanRepository::count_unpaid_closed_for_client(&mut conn, &client.id)
                .await
                .unwrap(),
            1
        );

        LoanRepository::set_total_charge(&mut conn, &loan.id, Money::zero(), Utc::now())
            .await
            .unwrap();
        assert_eq!(
            LoanRepository::count_unpaid_closed_for_client(&mut conn, &client.id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_mark_overdue_only_touches_past_due_active_loans() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let (client, tool) = seed(&mut conn).await;

        let overdue =
            Loan::open(&client.id, &tool.id, date(2025, 3, 1), date(2025, 3, 5), Utc::now());
        let current =
            Loan::open(&client.id, &tool.id, date(2025, 3, 1), date(2025, 3, 10), Utc::now());
        LoanRepository::insert(&mut conn, &overdue).await.unwrap();
        LoanRepository::insert(&mut conn, &current).await.unwrap();

        // Due on the 10th is not late on the 10th
        let changed = LoanRepository::mark_overdue(&mut conn, date(2025, 3, 10), Utc::now())
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let late = LoanRepository::list_by_status(&mut conn, LoanStatus::Late)
            .await
            .unwrap();
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].id, overdue.id);
        assert_eq!(
            LoanRepository::count_late_for_client(&mut conn, &client.id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_set_total_charge_on_missing_loan() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let err = LoanRepository::set_total_charge(&mut conn, "missing", Money::zero(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
