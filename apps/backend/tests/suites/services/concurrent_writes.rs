// Concurrent writes against the test database.

use std::collections::HashSet;

use backend_test_support::unique_helpers::{unique_email, unique_name};
use employee_api::domain::employees::{EmployeeInput, ListParams};
use employee_api::errors::domain::{ConflictKind, DomainError};
use futures_util::future::join_all;

use crate::support::build_test_state;

const WRITERS: usize = 16;

#[tokio::test]
async fn concurrent_creates_on_distinct_keys_all_land() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let svc = state.employees.clone();
    let last = unique_name("Crowd");

    let handles = (0..WRITERS).map(|i| {
        let svc = svc.clone();
        let input = EmployeeInput::new(format!("W{i}"), last.clone(), unique_email("crowd"));
        tokio::spawn(async move { svc.create(input).await })
    });

    let mut created = Vec::new();
    for joined in join_all(handles).await {
        created.push(joined??);
    }

    let ids: HashSet<_> = created.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), WRITERS, "ids must be distinct");

    let listed = svc
        .list(ListParams {
            last_name: Some(last.clone()),
            ..ListParams::default()
        })
        .await?;
    assert_eq!(listed.len(), WRITERS);
    for e in &created {
        assert_eq!(svc.get(e.id).await?, *e);
    }
    Ok(())
}

#[tokio::test]
async fn concurrent_updates_leave_unrelated_rows_untouched(
) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let svc = state.employees.clone();
    let last = unique_name("Iso");

    let bystander = svc
        .create(EmployeeInput::new("Bystander", last.clone(), unique_email("bystander")))
        .await?;

    let mut targets = Vec::new();
    for i in 0..WRITERS / 2 {
        targets.push(
            svc.create(EmployeeInput::new(format!("T{i}"), last.clone(), unique_email("target")))
                .await?,
        );
    }

    let handles = targets.iter().map(|t| {
        let svc = svc.clone();
        let id = t.id;
        let input = EmployeeInput::new(format!("U{id}"), last.clone(), unique_email("updated"));
        tokio::spawn(async move { svc.update(id, input).await })
    });
    for joined in join_all(handles).await {
        let updated = joined??;
        assert_eq!(updated.first_name, format!("U{}", updated.id));
    }

    assert_eq!(svc.get(bystander.id).await?, bystander);
    Ok(())
}

#[tokio::test]
async fn racing_creates_on_one_email_yield_one_winner() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let svc = state.employees.clone();
    let email = unique_email("race");

    let handles = (0..4).map(|i| {
        let svc = svc.clone();
        let input = EmployeeInput::new(format!("R{i}"), "Race", email.clone());
        tokio::spawn(async move { svc.create(input).await })
    });

    let results: Vec<Result<_, DomainError>> = join_all(handles)
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "{results:?}");
    for r in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(r, Err(DomainError::Conflict(ConflictKind::UniqueEmail, _))),
            "{r:?}"
        );
    }
    Ok(())
}
