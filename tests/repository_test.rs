//! A small repository written only against the provider traits, exercised
//! through the fake the way an application test would.

mod common;

use pretty_assertions::assert_eq;
use qail_fakedb::prelude::*;
use qail_fakedb::ReaderFixture;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: i32,
    customer: Option<String>,
    total: f64,
    shipped: bool,
}

struct OrderRepository<C: DbConnection> {
    connection: C,
}

impl<C> OrderRepository<C>
where
    C: DbConnection,
    C::Transaction: Clone,
{
    fn new(connection: C) -> Self {
        Self { connection }
    }

    async fn unshipped(&self, cancel: CancellationToken) -> FakeDbResult<Vec<Order>> {
        let mut command = self.connection.create_command();
        command.set_command_text("SELECT id, customer, total, shipped FROM orders WHERE shipped = @shipped");
        command.parameters_mut().add_with_value("@shipped", false);

        let reader = command
            .execute_reader_async(CommandBehavior::DEFAULT, cancel.clone())
            .await?;
        let (id, customer, total, shipped) = (
            reader.get_ordinal("id")?,
            reader.get_ordinal("customer")?,
            reader.get_ordinal("total")?,
            reader.get_ordinal("shipped")?,
        );
        let mut orders = Vec::new();
        while reader.read_async(cancel.clone()).await? {
            orders.push(Order {
                id: reader.get_i32(id)?,
                customer: if reader.is_db_null(customer)? {
                    None
                } else {
                    Some(reader.get_string(customer)?)
                },
                total: reader.get_double(total)?,
                shipped: reader.get_bool(shipped)?,
            });
        }
        reader.close();
        Ok(orders)
    }

    async fn count(&self, cancel: CancellationToken) -> FakeDbResult<i64> {
        let mut command = self.connection.create_command();
        command.set_command_text("SELECT COUNT(*) FROM orders");
        command.execute_scalar_async(cancel).await?.cast()
    }

    /// Mark the orders shipped inside one transaction.
    fn ship(&self, ids: &[i32]) -> FakeDbResult<u64> {
        self.connection.open()?;
        let transaction = self
            .connection
            .begin_transaction(IsolationLevel::ReadCommitted)?;
        let mut affected = 0;
        for id in ids {
            let mut command = self.connection.create_command();
            command.set_command_text("UPDATE orders SET shipped = true WHERE id = :id");
            command.parameters_mut().add_with_value(":id", *id);
            command.set_transaction(Some(transaction.clone()));
            match command.execute_non_query() {
                Ok(rows) => affected += rows,
                Err(e) => {
                    transaction.rollback()?;
                    self.connection.close();
                    return Err(e);
                }
            }
        }
        transaction.commit()?;
        self.connection.close();
        Ok(affected)
    }
}

fn orders_reader() -> FakeDbDataReader {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/orders.json");
    ReaderFixture::load(path).unwrap().into_reader()
}

#[tokio::test]
async fn test_repository_maps_reader_rows() {
    common::init_tracing();
    let reader = orders_reader();
    let handed_out = reader.clone();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let capture = captured.clone();

    let mut harness = FakeDbHarness::new();
    harness
        .set_execute_reader_async(move |command, _, _| {
            capture.lock().unwrap().push((
                command.command_text().to_string(),
                command.parameters().get_named("shipped").map(|p| p.value.clone()).ok(),
            ));
            let reader = handed_out.clone();
            Box::pin(async move { Ok(reader) })
        })
        .unwrap();

    let repository = OrderRepository::new(harness.connection());
    let orders = repository.unshipped(CancellationToken::new()).await.unwrap();

    // The hook ignores the filter, so every fixture row comes back.
    assert_eq!(
        orders,
        vec![
            Order { id: 1001, customer: Some("alice".into()), total: 19.5, shipped: true },
            Order { id: 1002, customer: Some("bob".into()), total: 7.25, shipped: false },
            Order { id: 1003, customer: None, total: 120.0, shipped: false },
        ]
    );
    assert_eq!(reader.read_async_count(), 4);
    assert_eq!(reader.close_count(), 1);
    assert!(reader.is_closed());

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].0.starts_with("SELECT id, customer"));
    assert_eq!(captured[0].1, Some(DbValue::Bool(false)));
}

#[tokio::test]
async fn test_repository_surfaces_type_mismatch() {
    common::init_tracing();
    let mut harness = FakeDbHarness::new();
    harness
        .set_execute_reader_async(|_, _, _| {
            Box::pin(async {
                FakeDbDataReader::from_json(
                    r#"{"columns": ["id", "customer", "total", "shipped"], "rows": [[1, "x", 10, false]]}"#,
                )
            })
        })
        .unwrap();

    let repository = OrderRepository::new(harness.connection());
    let err = repository
        .unshipped(CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unable to cast value of type Int32 to type Double"
    );
}

#[tokio::test]
async fn test_repository_scalar() {
    common::init_tracing();
    let mut harness = FakeDbHarness::new();
    harness
        .set_execute_scalar_async(|_, _| Box::pin(async { Ok(DbValue::Int64(3)) }))
        .unwrap();

    let repository = OrderRepository::new(harness.connection());
    assert_eq!(repository.count(CancellationToken::new()).await.unwrap(), 3);
}

#[test]
fn test_repository_transaction_commits() {
    common::init_tracing();
    let mut harness = FakeDbHarness::new();
    harness
        .set_execute_non_query_async(|command, _| {
            let known = command
                .parameters()
                .get_named("id")
                .map(|p| p.value == DbValue::Int32(1001))
                .unwrap_or(false);
            Box::pin(async move { Ok(u64::from(known)) })
        })
        .unwrap();

    let connection = harness.fake_connection();
    let repository = OrderRepository::new(connection.clone());
    assert_eq!(repository.ship(&[1001, 1002]).unwrap(), 1);

    assert!(connection.active_transaction().is_none());
    assert_eq!(connection.open_count(), 1);
    assert_eq!(connection.close_count(), 1);
}

#[test]
fn test_repository_transaction_rolls_back_on_failure() {
    common::init_tracing();
    let mut harness = FakeDbHarness::new();
    harness
        .set_execute_non_query_async(|_, _| {
            Box::pin(async { Err(anyhow::anyhow!("deadlock victim").into()) })
        })
        .unwrap();

    let connection = harness.fake_connection();
    let repository = OrderRepository::new(connection.clone());
    let err = repository.ship(&[1001]).unwrap_err();

    assert_eq!(err.to_string(), "Hook error: deadlock victim");
    assert!(connection.active_transaction().is_none());
    assert_eq!(connection.state(), ConnectionState::Closed);
}
