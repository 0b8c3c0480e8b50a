// Commit and rollback behavior of db::txn::with_txn.

use std::time::Duration;

use backend_test_support::unique_helpers::unique_email;
use employee_api::adapters::employees_sea::{self as employees_adapter, EmployeeCreate, EmployeeUpdate};
use employee_api::db::require_db;
use employee_api::db::txn::with_txn;
use employee_api::errors::domain::DomainError;
use tracing::debug;

use crate::support::build_test_state;

#[tokio::test]
async fn ok_body_commits() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;
    let email = unique_email("commit");

    let row = with_txn::<_, _, DomainError, _>(db, |txn| {
        let email = email.clone();
        Box::pin(async move {
            Ok(employees_adapter::insert_employee(txn, EmployeeCreate::new("Com", "Mit", email)).await?)
        })
    })
    .await?;

    let visible = employees_adapter::find_by_email(db, &email).await?;
    assert_eq!(visible, Some(row));
    Ok(())
}

#[tokio::test]
async fn err_body_rolls_back_and_keeps_the_error() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;
    let email = unique_email("rollback");

    let result = with_txn::<_, (), DomainError, _>(db, |txn| {
        let email = email.clone();
        Box::pin(async move {
            employees_adapter::insert_employee(txn, EmployeeCreate::new("Roll", "Back", email)).await?;
            debug!("inserted employee inside txn before error");
            Err(DomainError::validation_other("forced failure"))
        })
    })
    .await;

    assert_eq!(
        result.unwrap_err(),
        DomainError::validation_other("forced failure")
    );
    assert!(employees_adapter::find_by_email(db, &email).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn dropped_body_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;
    let email = unique_email("dropped");

    let pending = with_txn::<_, (), DomainError, _>(db, |txn| {
        let email = email.clone();
        Box::pin(async move {
            employees_adapter::insert_employee(txn, EmployeeCreate::new("Drop", "Ped", email)).await?;
            std::future::pending::<()>().await;
            Ok(())
        })
    });

    let timed_out = tokio::time::timeout(Duration::from_millis(200), pending).await;
    assert!(timed_out.is_err(), "body never completes");

    assert!(employees_adapter::find_by_email(db, &email).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn statements_in_one_txn_see_each_other_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let db = require_db(&state)?;
    let first = unique_email("order-a");
    let second = unique_email("order-b");

    let (inserted, updated, reread) = with_txn::<_, _, DomainError, _>(db, |txn| {
        let first = first.clone();
        let second = second.clone();
        Box::pin(async move {
            let inserted =
                employees_adapter::insert_employee(txn, EmployeeCreate::new("Ord", "Er", first)).await?;
            let updated = employees_adapter::update_employee(
                txn,
                EmployeeUpdate::new(inserted.id, "Ord", "Er", second.clone()),
            )
            .await?;
            let reread = employees_adapter::find_by_email(txn, &second).await?;
            Ok((inserted, updated, reread))
        })
    })
    .await?;

    let updated = updated.ok_or("update inside txn found no row")?;
    assert_eq!(updated.id, inserted.id);
    assert_eq!(reread, Some(updated));
    assert!(employees_adapter::find_by_email(db, &first).await?.is_none());
    Ok(())
}
