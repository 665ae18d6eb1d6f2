use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::errors::VishnoraError;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;";

pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, VishnoraError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| VishnoraError::Persistence(format!("Failed to open database: {}", e)))?;
        conn.execute_batch(PRAGMAS)
            .map_err(|e| VishnoraError::Persistence(format!("Failed to set pragmas: {}", e)))?;

        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, VishnoraError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| VishnoraError::Persistence(format!("Failed to open in-memory db: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| VishnoraError::Persistence(format!("Failed to set pragmas: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), VishnoraError> {
        self.lock()?
            .execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| VishnoraError::Persistence(format!("Failed to create tables: {}", e)))
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, VishnoraError> {
        self.conn
            .lock()
            .map_err(|_| VishnoraError::Persistence("Database mutex poisoned".to_string()))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}
