use std::sync::Arc;

use employee_api::domain::employees::{EmployeeInput, ListParams};
use employee_api::errors::domain::{
    ConflictKind, DomainError, InfraErrorKind, NotFoundKind, ValidationKind,
};
use employee_api::services::EmployeeService;

use crate::support::factory::employee_input;
use crate::support::{fast_policy, MemoryEmployeeRepository};

fn service() -> (EmployeeService, Arc<MemoryEmployeeRepository>) {
    let repo = Arc::new(MemoryEmployeeRepository::new());
    (EmployeeService::new(repo.clone(), fast_policy()), repo)
}

#[tokio::test]
async fn create_then_get_returns_equal_record() -> Result<(), DomainError> {
    let (svc, _) = service();

    let created = svc.create(employee_input("Ada", "Lovelace")).await?;
    let fetched = svc.get(created.id).await?;

    assert_eq!(fetched, created);
    Ok(())
}

#[tokio::test]
async fn create_normalizes_input() -> Result<(), DomainError> {
    let (svc, _) = service();

    let created = svc
        .create(EmployeeInput::new(" Alan ", "\tTuring\n", " Alan.Turing@Example.ORG "))
        .await?;

    assert_eq!(created.first_name, "Alan");
    assert_eq!(created.last_name, "Turing");
    assert_eq!(created.email, "alan.turing@example.org");
    Ok(())
}

#[tokio::test]
async fn invalid_input_never_reaches_the_repository() {
    let (svc, repo) = service();

    let err = svc
        .create(EmployeeInput::new("A", "B", "missing-at.example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ValidationKind::InvalidEmail, _)));

    let err = svc
        .create(EmployeeInput {
            first_name: None,
            last_name: Some("B".into()),
            email: Some("a@b.co".into()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ValidationKind::MissingField, _)));

    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> Result<(), DomainError> {
    let (svc, repo) = service();

    svc.create(EmployeeInput::new("A", "One", "same@example.com")).await?;
    let err = svc
        .create(EmployeeInput::new("B", "Two", "SAME@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Conflict(ConflictKind::UniqueEmail, _)));
    assert_eq!(repo.len(), 1);
    Ok(())
}

#[tokio::test]
async fn update_changes_fields_and_keeps_identity() -> Result<(), DomainError> {
    let (svc, _) = service();

    let created = svc.create(employee_input("Old", "Name")).await?;
    let updated = svc
        .update(created.id, EmployeeInput::new("New", "Name", "new.name@example.com"))
        .await?;

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.first_name, "New");
    assert_eq!(updated.email, "new.name@example.com");
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(svc.get(created.id).await?, updated);
    Ok(())
}

#[tokio::test]
async fn update_to_anothers_email_is_a_conflict() -> Result<(), DomainError> {
    let (svc, repo) = service();

    let a = svc.create(EmployeeInput::new("A", "A", "a@example.com")).await?;
    let b = svc.create(EmployeeInput::new("B", "B", "b@example.com")).await?;
    let before = repo.snapshot();

    let err = svc
        .update(b.id, EmployeeInput::new("B", "B", &a.email))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Conflict(ConflictKind::UniqueEmail, _)));
    assert_eq!(repo.snapshot(), before);
    Ok(())
}

#[tokio::test]
async fn update_validates_before_looking_up() {
    let (svc, _) = service();

    // Invalid input on a missing id reports the validation failure.
    let err = svc
        .update(404, EmployeeInput::new("", "B", "b@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ValidationKind::MissingField, _)));
}

#[tokio::test]
async fn missing_employee_is_not_found_everywhere() {
    let (svc, _) = service();

    let get = svc.get(77).await.unwrap_err();
    let update = svc.update(77, employee_input("X", "Y")).await.unwrap_err();
    let delete = svc.delete(77).await.unwrap_err();

    for err in [get, update, delete] {
        assert_eq!(
            err,
            DomainError::not_found(NotFoundKind::Employee, "Employee 77 not found")
        );
    }
}

#[tokio::test]
async fn delete_then_get_is_not_found() -> Result<(), DomainError> {
    let (svc, repo) = service();

    let created = svc.create(employee_input("Short", "Lived")).await?;
    svc.delete(created.id).await?;

    assert!(matches!(
        svc.get(created.id).await.unwrap_err(),
        DomainError::NotFound(NotFoundKind::Employee, _)
    ));
    assert_eq!(repo.len(), 0);
    Ok(())
}

#[tokio::test]
async fn list_applies_predicates_and_paging() -> Result<(), DomainError> {
    let (svc, _) = service();

    for (first, last) in [("Ann", "Lee"), ("Bob", "Lee"), ("Ann", "Moe"), ("Dee", "Lee")] {
        svc.create(employee_input(first, last)).await?;
    }

    let lees = svc
        .list(ListParams {
            last_name: Some("Lee".into()),
            ..ListParams::default()
        })
        .await?;
    assert_eq!(lees.len(), 3);

    let anns = svc
        .list(ListParams {
            first_name: Some(" Ann ".into()),
            ..ListParams::default()
        })
        .await?;
    assert!(anns.iter().all(|e| e.first_name == "Ann"));
    assert_eq!(anns.len(), 2);

    let page = svc
        .list(ListParams {
            limit: Some(2),
            offset: Some(1),
            ..ListParams::default()
        })
        .await?;
    let all = svc.list(ListParams::default()).await?;
    assert_eq!(page, all[1..3].to_vec());
    Ok(())
}

#[tokio::test]
async fn list_rejects_out_of_range_limit() {
    let (svc, _) = service();

    for limit in [0, 501] {
        let err = svc
            .list(ListParams {
                limit: Some(limit),
                ..ListParams::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationKind::InvalidQuery, _)));
    }
}

#[tokio::test]
async fn unavailable_repository_surfaces_infra_error() {
    let svc = EmployeeService::new(
        Arc::new(employee_api::repos::UnavailableRepository),
        fast_policy(),
    );

    let err = svc.create(employee_input("No", "Db")).await.unwrap_err();
    assert!(matches!(err, DomainError::Infra(InfraErrorKind::DbUnavailable, _)));
}
