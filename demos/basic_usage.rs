//! Basic usage example for aql-cursor.

use aql_cursor::{Cursor, Database, Statement};
use serde::Deserialize;
use std::error::Error;
use std::str::FromStr;

const HOST: &str = "localhost";
const PORT: u16 = 8529;
const USER: &str = "root";
const PASSWORD: &str = "test";
const DATABASE: &str = "_system";

#[derive(Debug, Deserialize)]
struct Square {
    n: u32,
    square: u32,
}

/// Opens the database handle. No request is sent yet.
fn example_database() -> Result<Database, Box<dyn Error>> {
    let conn_string = format!(
        "arangodb://{}:{}@{}:{}/{}?request_timeout=60",
        USER, PASSWORD, HOST, PORT, DATABASE
    );
    Ok(Database::from_str(&conn_string)?)
}

/// Runs a query spanning several batches and walks it document by document.
async fn example_iterate(db: &Database) -> Result<u64, Box<dyn Error>> {
    let stmt = Statement::builder("FOR i IN 1..@max RETURN { n: i, square: i * i }")
        .bind("max", 50)
        .batch_size(20)
        .count(true)
        .build();

    let mut cursor: Cursor = db.query(&stmt).await?;
    println!("Expecting {:?} results", cursor.count());

    while cursor.has_next() {
        let row: Square = cursor.next_as().await?;
        if row.n % 10 == 0 {
            println!("  {}^2 = {}", row.n, row.square);
        }
    }

    let yielded = cursor.documents_yielded();
    cursor.delete().await?;
    Ok(yielded)
}

/// Reads only the first document and releases the rest on the server.
async fn example_early_release(db: &Database) -> Result<bool, Box<dyn Error>> {
    let stmt = Statement::builder("FOR i IN 1..10000 RETURN i")
        .batch_size(100)
        .build();

    let mut cursor = db.query(&stmt).await?;
    let first = cursor.next().await?;
    println!("First value: {}", first);

    Ok(cursor.delete().await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let db = example_database()?;
    println!("Using {}", db.connection_string());

    let rows = example_iterate(&db).await?;
    println!("Iterated: {} document(s)", rows);

    let released = example_early_release(&db).await?;
    println!("Released early: {}", released);

    println!("Done");
    Ok(())
}
