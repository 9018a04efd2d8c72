//! # SQL Statements
//!
//! Centralizes the SQL for the turso-backed stores so the store logic stays
//! free of database-specific syntax.

pub const CREATE_CACHE_ENTRIES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS cache_entries (
        pk TEXT NOT NULL,
        sk TEXT NOT NULL DEFAULT 'metadata',
        file_uri TEXT NOT NULL,
        content_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        etag TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        updated_status TEXT NOT NULL,
        ingested_at INTEGER,
        PRIMARY KEY (pk, sk)
    );
";

/// Backs the READYDELETE sweep.
pub const CREATE_CACHE_STATUS_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_cache_entries_status
    ON cache_entries (updated_status);
";

pub const CREATE_MEDIA_LINKS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS media_links (
        uuid TEXT PRIMARY KEY,
        original_link TEXT NOT NULL,
        type TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
";

pub const CREATE_EMBEDDINGS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS embeddings (
        id TEXT PRIMARY KEY,
        source_uri TEXT NOT NULL,
        page INTEGER,
        title TEXT,
        section_header TEXT,
        content TEXT NOT NULL,
        metadata TEXT,
        embedding BLOB NOT NULL
    );
";

pub const CREATE_EMBEDDINGS_SOURCE_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_embeddings_source_uri
    ON embeddings (source_uri);
";

pub const DROP_EMBEDDINGS_TABLE: &str = "DROP TABLE IF EXISTS embeddings;";

/// Everything needed to initialize a fresh database.
pub const ALL_TABLE_CREATION_SQL: [&str; 5] = [
    CREATE_CACHE_ENTRIES_TABLE,
    CREATE_CACHE_STATUS_INDEX,
    CREATE_MEDIA_LINKS_TABLE,
    CREATE_EMBEDDINGS_TABLE,
    CREATE_EMBEDDINGS_SOURCE_INDEX,
];
