use db2_middleware::prelude::*;
use db2_middleware::test_utils::{MockOp, mock_connection, options};

#[tokio::test]
async fn commit_restores_auto_commit() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Odbc));
    let mut tx = conn.begin_transaction().await?;
    assert!(tx.is_open());
    assert_eq!(tx.isolation_level()?, IsolationLevel::ReadCommitted);
    {
        let mut cmd = tx.command()?;
        cmd.set_command_text("INSERT INTO T VALUES (:V)");
        cmd.parameters_mut().add_with_value(":V", 1_i32)?;
        cmd.execute_non_query().await?;
    }
    tx.commit().await?;
    assert!(!tx.is_open());
    assert!(matches!(tx.commit().await, Err(Db2Error::TransactionCompleted)));
    assert!(matches!(tx.rollback().await, Err(Db2Error::TransactionCompleted)));
    assert!(matches!(tx.isolation_level(), Err(Db2Error::TransactionCompleted)));
    assert!(matches!(tx.command(), Err(Db2Error::TransactionCompleted)));
    drop(tx);

    let state = driver.state();
    assert_eq!(state.isolation, vec![2]);
    assert_eq!(state.auto_commit, vec![false, true]);
    assert_eq!(state.commits, 1);
    assert_eq!(state.rollbacks, 0);
    Ok(())
}

#[tokio::test]
async fn rollback_with_explicit_isolation() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Jdbc));
    let mut tx = conn.begin_transaction_with(IsolationLevel::Serializable).await?;
    assert_eq!(tx.isolation_level()?, IsolationLevel::Serializable);
    tx.rollback().await?;
    drop(tx);

    let mut tx = conn.begin_transaction_with(IsolationLevel::Unspecified).await?;
    assert_eq!(tx.isolation_level()?, IsolationLevel::ReadCommitted);
    tx.commit().await?;
    drop(tx);

    let state = driver.state();
    assert_eq!(state.isolation, vec![8, 2]);
    assert_eq!(state.rollbacks, 1);
    assert_eq!(state.commits, 1);
    Ok(())
}

#[tokio::test]
async fn snapshot_isolation_is_rejected() {
    let (mut conn, driver) = mock_connection(options(Transport::Odbc));
    let result = conn.begin_transaction_with(IsolationLevel::Snapshot).await;
    assert!(matches!(result, Err(Db2Error::UnsupportedIsolationLevel(_))));
    drop(result);
    assert!(driver.state().isolation.is_empty());
    assert!(driver.state().auto_commit.is_empty());
}

#[tokio::test]
async fn failed_commit_still_completes_the_transaction() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Odbc));
    driver.fail_next(MockOp::Commit, NativeError::sql("40001", "deadlock"));
    let mut tx = conn.begin_transaction().await?;
    let err = tx.commit().await.err();
    assert!(err.as_ref().is_some_and(Db2Error::is_native));
    assert!(!tx.is_open());
    assert!(matches!(tx.rollback().await, Err(Db2Error::TransactionCompleted)));
    drop(tx);
    assert_eq!(driver.state().auto_commit, vec![false, true]);
    Ok(())
}

#[tokio::test]
async fn dropped_transaction_rolls_back_before_next_call() -> Result<(), Db2Error> {
    let (mut conn, driver) = mock_connection(options(Transport::Odbc));
    {
        let _tx = conn.begin_transaction().await?;
    }
    assert_eq!(driver.state().rollbacks, 0);

    let mut cmd = conn.create_command();
    cmd.set_command_text("DELETE FROM T");
    cmd.execute_non_query().await?;
    drop(cmd);

    let state = driver.state();
    assert_eq!(state.rollbacks, 1);
    assert_eq!(state.auto_commit, vec![false, true]);
    assert_eq!(state.prepared, vec!["DELETE FROM T".to_string()]);
    Ok(())
}
