//! Chinook database server: SQL execution, table listing, and schema
//! inspection over a SQLite file.
//!
//! Operation answers are plain text for the model, with user-facing
//! messages kept in Korean as the assistant speaks to Korean users.
//! SQL failures are answered as text rather than raised, so a bad
//! query stays visible to the model instead of ending the session.

use crate::server::required_str;
use crate::{OperationSpec, ServerError, ToolServer};
use async_trait::async_trait;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Mutex;

const LABEL: &str = "chinook_db_server";

#[derive(Debug)]
pub struct ChinookServer {
    conn: Mutex<Option<Connection>>,
}

impl ChinookServer {
    /// Open the database file. Refuses to start without it; a server
    /// over a missing database would answer every query with an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ServerError::MissingDataFile(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Run one SQL statement. SELECT answers are a ` | `-separated
    /// table; write statements answer with the affected row count.
    pub fn execute_sql_query(&self, query: &str) -> Result<String, ServerError> {
        let guard = self.conn.lock().expect("chinook connection mutex poisoned");
        let conn = guard.as_ref().ok_or(ServerError::ConnectionClosed)?;
        Ok(match run_query(conn, query) {
            Ok(text) => text,
            Err(error) => format!("쿼리 실행 중 오류 발생: {error}"),
        })
    }

    /// All table names, lexicographic.
    pub fn list_tables(&self) -> Result<Vec<String>, ServerError> {
        let guard = self.conn.lock().expect("chinook connection mutex poisoned");
        let conn = guard.as_ref().ok_or(ServerError::ConnectionClosed)?;
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, rusqlite::Error>>()?;
        Ok(tables)
    }

    /// Column layout of one table. An absent table is a normal answer,
    /// not an error.
    pub fn get_table_schema(&self, table_name: &str) -> Result<String, ServerError> {
        let guard = self.conn.lock().expect("chinook connection mutex poisoned");
        let conn = guard.as_ref().ok_or(ServerError::ConnectionClosed)?;

        let mut lines: Vec<String> = Vec::new();
        conn.pragma(None, "table_info", table_name, |row| {
            let name: String = row.get(1)?;
            let column_type: String = row.get(2)?;
            let not_null: i64 = row.get(3)?;
            let default_value = match row.get_ref(4)? {
                ValueRef::Null => String::new(),
                other => value_text(other),
            };
            let nullable = if not_null != 0 { "NO" } else { "YES" };
            lines.push(format!("{name} | {column_type} | {nullable} | {default_value}"));
            Ok(())
        })?;

        if lines.is_empty() {
            return Ok(format!("테이블 '{table_name}'을 찾을 수 없습니다."));
        }

        let mut schema = vec![
            format!("테이블: {table_name}"),
            "-".repeat(40),
            "컬럼명 | 타입 | NULL 허용 | 기본값".to_string(),
            "-".repeat(40),
        ];
        schema.extend(lines);
        Ok(schema.join("\n"))
    }
}

fn run_query(conn: &Connection, query: &str) -> Result<String, rusqlite::Error> {
    if query.trim_start().to_uppercase().starts_with("SELECT") {
        let mut stmt = conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let header = columns.join(" | ");
        let mut lines = vec![header.clone(), "-".repeat(header.len())];

        let mut rows = stmt.query([])?;
        let mut row_count = 0usize;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                cells.push(value_text(row.get_ref(index)?));
            }
            lines.push(cells.join(" | "));
            row_count += 1;
        }

        if row_count == 0 {
            return Ok("쿼리 결과가 없습니다.".to_string());
        }
        Ok(lines.join("\n"))
    } else {
        let affected = conn.execute(query, [])?;
        Ok(format!(
            "쿼리가 성공적으로 실행되었습니다. 영향받은 행: {affected}"
        ))
    }
}

fn value_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(blob) => format!("<blob {} bytes>", blob.len()),
    }
}

#[async_trait]
impl ToolServer for ChinookServer {
    fn label(&self) -> &str {
        LABEL
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new(
                "execute_sql_query",
                "SQL 쿼리를 실행하고 결과를 반환합니다.",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            ),
            OperationSpec::new(
                "list_tables",
                "Chinook 데이터베이스의 모든 테이블 목록을 반환합니다.",
                json!({"type": "object", "properties": {}}),
            ),
            OperationSpec::new(
                "get_table_schema",
                "특정 테이블의 스키마 정보(컬럼명, 데이터 타입 등)를 조회합니다.",
                json!({
                    "type": "object",
                    "properties": {"table_name": {"type": "string"}},
                    "required": ["table_name"]
                }),
            ),
        ]
    }

    async fn call(&self, operation: &str, arguments: Value) -> Result<String, ServerError> {
        match operation {
            "execute_sql_query" => {
                let query = required_str(&arguments, "query")?;
                self.execute_sql_query(query)
            }
            "list_tables" => Ok(match self.list_tables() {
                Ok(tables) => json!(tables).to_string(),
                Err(error) => {
                    json!([format!("테이블 목록 조회 중 오류 발생: {error}")]).to_string()
                }
            }),
            "get_table_schema" => {
                let table_name = required_str(&arguments, "table_name")?;
                Ok(match self.get_table_schema(table_name) {
                    Ok(text) => text,
                    Err(error) => format!("스키마 조회 중 오류 발생: {error}"),
                })
            }
            other => Err(ServerError::UnknownOperation(other.to_string())),
        }
    }

    fn shutdown(&self) -> Result<(), ServerError> {
        let mut guard = self.conn.lock().expect("chinook connection mutex poisoned");
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, error)| ServerError::Database(error))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_db() -> (TempDir, ChinookServer) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chinook.db");
        let conn = Connection::open(&path).expect("create db");
        conn.execute_batch(
            "CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name NVARCHAR(120) NOT NULL);
             CREATE TABLE Album (
                 AlbumId INTEGER PRIMARY KEY,
                 Title NVARCHAR(160) NOT NULL,
                 ArtistId INTEGER NOT NULL
             );
             INSERT INTO Artist (ArtistId, Name) VALUES (1, 'AC/DC');
             INSERT INTO Album (AlbumId, Title, ArtistId)
                 VALUES (1, 'For Those About To Rock', 1);",
        )
        .expect("seed schema");
        drop(conn);
        let server = ChinookServer::open(&path).expect("open");
        (dir, server)
    }

    #[test]
    fn missing_database_file_refuses_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope.db");
        let error = ChinookServer::open(&path).expect_err("must refuse");
        assert!(matches!(error, ServerError::MissingDataFile(p) if p == path));
    }

    #[test]
    fn select_answers_as_pipe_separated_table() {
        let (_dir, server) = seeded_db();
        let answer = server
            .execute_sql_query("SELECT ArtistId, Name FROM Artist")
            .expect("query");
        let lines: Vec<&str> = answer.lines().collect();
        assert_eq!(lines[0], "ArtistId | Name");
        assert_eq!(lines[2], "1 | AC/DC");
    }

    #[test]
    fn empty_select_answers_with_no_result_message() {
        let (_dir, server) = seeded_db();
        let answer = server
            .execute_sql_query("SELECT * FROM Album WHERE AlbumId = 999")
            .expect("query");
        assert_eq!(answer, "쿼리 결과가 없습니다.");
    }

    #[test]
    fn sql_errors_come_back_as_text_not_failures() {
        let (_dir, server) = seeded_db();
        let answer = server
            .execute_sql_query("SELECT * FROM NoSuchTable")
            .expect("query still answers");
        assert!(answer.starts_with("쿼리 실행 중 오류 발생:"));
    }

    #[test]
    fn writes_answer_with_affected_row_count() {
        let (_dir, server) = seeded_db();
        let answer = server
            .execute_sql_query("INSERT INTO Artist (ArtistId, Name) VALUES (2, 'Accept')")
            .expect("insert");
        assert_eq!(answer, "쿼리가 성공적으로 실행되었습니다. 영향받은 행: 1");
    }

    #[test]
    fn tables_are_listed_lexicographically() {
        let (_dir, server) = seeded_db();
        let tables = server.list_tables().expect("list");
        assert_eq!(tables, ["Album", "Artist"]);
    }

    #[test]
    fn schema_carries_header_and_column_rows() {
        let (_dir, server) = seeded_db();
        let schema = server.get_table_schema("Artist").expect("schema");
        let lines: Vec<&str> = schema.lines().collect();
        assert_eq!(lines[0], "테이블: Artist");
        assert_eq!(lines[2], "컬럼명 | 타입 | NULL 허용 | 기본값");
        assert!(lines[4].starts_with("ArtistId | INTEGER"));
        assert!(schema.contains("Name | NVARCHAR(120) | NO | "));
    }

    #[test]
    fn absent_table_schema_is_an_answer_not_an_error() {
        let (_dir, server) = seeded_db();
        let answer = server.get_table_schema("Nope").expect("answer");
        assert_eq!(answer, "테이블 'Nope'을 찾을 수 없습니다.");
    }

    #[test]
    fn closed_connection_is_reported() {
        let (_dir, server) = seeded_db();
        server.shutdown().expect("shutdown");
        let error = server
            .execute_sql_query("SELECT 1")
            .expect_err("closed connection");
        assert!(matches!(error, ServerError::ConnectionClosed));
    }

    #[test]
    fn shutdown_tolerates_repeat_calls() {
        let (_dir, server) = seeded_db();
        server.shutdown().expect("first shutdown");
        server.shutdown().expect("second shutdown");
    }
}
