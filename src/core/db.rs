use anyhow::Result;
use tokio_rusqlite::Connection;

/// Open the app database at `path`, creating the schema if needed.
pub async fn async_db(path: &str) -> Result<Connection> {
    let db = Connection::open(path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    Ok(db)
}

/// In-memory database with the schema applied. Used by tests and by
/// throwaway sessions.
pub async fn memory_db() -> Result<Connection> {
    let db = Connection::open_in_memory().await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    Ok(db)
}

pub fn initialize_db(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS user_account (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            salt TEXT NOT NULL,
            password_hash TEXT NOT NULL
        );

        -- Append-only. Rows are never updated or deleted by the app.
        CREATE TABLE IF NOT EXISTS transcript_message (
            id TEXT PRIMARY KEY,
            namespace TEXT NOT NULL,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL,
            text TEXT NOT NULL,
            sources TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS transcript_message_owner_idx
            ON transcript_message (namespace, user_id, created_at);
        ",
    )
}
