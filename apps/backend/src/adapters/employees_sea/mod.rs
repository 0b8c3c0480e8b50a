//! SeaORM adapter for the employee repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::entities::employees;

pub mod dto;

pub use dto::{EmployeeCreate, EmployeeFilter, EmployeeUpdate};

// Adapter functions return DbErr; the repos layer maps to DomainError via From<DbErr>.

pub async fn insert_employee<C: ConnectionTrait>(
    conn: &C,
    dto: EmployeeCreate,
) -> Result<employees::Model, sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();
    let active = employees::ActiveModel {
        id: NotSet,
        first_name: Set(dto.first_name),
        last_name: Set(dto.last_name),
        email: Set(dto.email),
        created_at: Set(now),
        updated_at: Set(now),
    };

    active.insert(conn).await
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<employees::Model>, sea_orm::DbErr> {
    employees::Entity::find_by_id(id).one(conn).await
}

pub async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<employees::Model>, sea_orm::DbErr> {
    employees::Entity::find()
        .filter(employees::Column::Email.eq(email))
        .one(conn)
        .await
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: EmployeeFilter,
) -> Result<Vec<employees::Model>, sea_orm::DbErr> {
    let mut query = employees::Entity::find();
    if let Some(email) = filter.email {
        query = query.filter(employees::Column::Email.eq(email));
    }
    if let Some(first_name) = filter.first_name {
        query = query.filter(employees::Column::FirstName.eq(first_name));
    }
    if let Some(last_name) = filter.last_name {
        query = query.filter(employees::Column::LastName.eq(last_name));
    }

    query
        .order_by_asc(employees::Column::Id)
        .limit(filter.limit)
        .offset(filter.offset)
        .all(conn)
        .await
}

/// Replace names and email and bump `updated_at`. `None` when no row has `dto.id`.
pub async fn update_employee<C: ConnectionTrait>(
    conn: &C,
    dto: EmployeeUpdate,
) -> Result<Option<employees::Model>, sea_orm::DbErr> {
    let Some(existing) = find_by_id(conn, dto.id).await? else {
        return Ok(None);
    };

    let mut active: employees::ActiveModel = existing.into();
    active.first_name = Set(dto.first_name);
    active.last_name = Set(dto.last_name);
    active.email = Set(dto.email);
    active.updated_at = Set(OffsetDateTime::now_utc());

    active.update(conn).await.map(Some)
}

/// Returns whether a row was removed.
pub async fn delete_employee<C: ConnectionTrait>(conn: &C, id: i64) -> Result<bool, sea_orm::DbErr> {
    let res = employees::Entity::delete_by_id(id).exec(conn).await?;
    Ok(res.rows_affected > 0)
}
