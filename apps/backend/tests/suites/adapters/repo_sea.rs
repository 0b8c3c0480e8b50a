// SeaEmployeeRepository against the test database.

use backend_test_support::unique_helpers::{unique_email, unique_name};
use employee_api::db::require_db;
use employee_api::errors::domain::{ConflictKind, DomainError};
use employee_api::repos::{
    EmployeeChanges, EmployeeQuery, EmployeeRepository, NewEmployee, SeaEmployeeRepository,
};

use crate::support::build_test_state;

fn new_employee(first: &str, last: &str) -> NewEmployee {
    NewEmployee {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: unique_email(&first.to_lowercase()),
    }
}

#[tokio::test]
async fn create_find_update_delete() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let repo = SeaEmployeeRepository::new(require_db(&state)?.clone());

    let created = repo.create(new_employee("Repo", "Round")).await?;
    assert_eq!(repo.find_by_id(created.id).await?, Some(created.clone()));
    assert_eq!(
        repo.find_by_email(&created.email).await?,
        Some(created.clone())
    );

    let changes = EmployeeChanges {
        first_name: "Changed".into(),
        last_name: created.last_name.clone(),
        email: created.email.clone(),
    };
    let updated = repo.update(created.id, changes).await?.expect("row exists");
    assert_eq!(updated.first_name, "Changed");
    assert_eq!(repo.find_by_id(created.id).await?, Some(updated));

    assert!(repo.delete(created.id).await?);
    assert_eq!(repo.find_by_id(created.id).await?, None);
    assert!(!repo.delete(created.id).await?);
    Ok(())
}

#[tokio::test]
async fn update_of_missing_row_is_none() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let repo = SeaEmployeeRepository::new(require_db(&state)?.clone());

    let changes = EmployeeChanges {
        first_name: "No".into(),
        last_name: "Body".into(),
        email: unique_email("nobody"),
    };
    assert_eq!(repo.update(i64::MAX - 1, changes).await?, None);
    Ok(())
}

#[tokio::test]
async fn unique_index_guards_create_and_update() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let repo = SeaEmployeeRepository::new(require_db(&state)?.clone());

    let a = repo.create(new_employee("Alpha", "Uniq")).await?;
    let b = repo.create(new_employee("Beta", "Uniq")).await?;

    // The repository has no pre-check; the database rejects these.
    let dup = NewEmployee {
        email: a.email.clone(),
        ..new_employee("Gamma", "Uniq")
    };
    let err = repo.create(dup).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::UniqueEmail, _)), "{err:?}");

    let steal = EmployeeChanges {
        first_name: b.first_name.clone(),
        last_name: b.last_name.clone(),
        email: a.email.clone(),
    };
    let err = repo.update(b.id, steal).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::UniqueEmail, _)), "{err:?}");

    // The failed update rolled back
    assert_eq!(repo.find_by_id(b.id).await?, Some(b));
    Ok(())
}

#[tokio::test]
async fn list_respects_query() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_test_state().await?;
    let repo = SeaEmployeeRepository::new(require_db(&state)?.clone());
    let last = unique_name("Query");

    for first in ["One", "Two", "Three"] {
        repo.create(new_employee(first, &last)).await?;
    }

    let query = EmployeeQuery {
        last_name: Some(last.clone()),
        limit: 2,
        ..EmployeeQuery::default()
    };
    let page = repo.list(&query).await?;
    assert_eq!(
        page.iter().map(|e| e.first_name.as_str()).collect::<Vec<_>>(),
        ["One", "Two"]
    );
    Ok(())
}
