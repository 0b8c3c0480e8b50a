use futures_util::future::BoxFuture;
use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr, TransactionTrait};
use tracing::warn;

/// Execute `f` inside a fresh transaction.
///
/// Commits when `f` returns `Ok`, rolls back (best effort, original error kept)
/// when it returns `Err`. If the returned future is dropped mid-flight the
/// `DatabaseTransaction` drop guard rolls back and the connection goes back
/// to the pool.
///
/// Statements issued through the transaction run in issuance order on one
/// connection.
pub async fn with_txn<C, R, E, F>(db: &C, f: F) -> Result<R, E>
where
    C: TransactionTrait + ConnectionTrait,
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<R, E>> + Send,
    R: Send,
    E: From<DbErr> + Send,
{
    let txn = db.begin().await.map_err(E::from)?;

    match f(&txn).await {
        Ok(val) => {
            txn.commit().await.map_err(E::from)?;
            Ok(val)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "rollback after failed transaction body did not complete");
            }
            Err(err)
        }
    }
}
