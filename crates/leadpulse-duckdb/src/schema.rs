/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// Timestamps are stored as epoch milliseconds (`BIGINT`) to match the
/// millisecond clock used by the tracking snippet.
///
/// Ids are allocated as `MAX(id) + 1` while holding the connection mutex;
/// there is no second writer.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- BUSINESSES (CRM leads; one tracked site each)
-- ===========================================
CREATE TABLE IF NOT EXISTS businesses (
    id              BIGINT PRIMARY KEY,
    site_id         VARCHAR NOT NULL UNIQUE,
    name            VARCHAR NOT NULL,
    place_id        VARCHAR NOT NULL,
    region          VARCHAR NOT NULL,
    rating          DOUBLE,
    total_reviews   BIGINT,
    has_website     BOOLEAN,
    has_facebook    BOOLEAN,
    city            VARCHAR,
    pipeline_stage  VARCHAR NOT NULL DEFAULT 'website_created',
    last_viewed_ms  BIGINT,
    total_views     BIGINT NOT NULL DEFAULT 0,
    notes           VARCHAR,
    owner_name      VARCHAR,
    introduction    VARCHAR,
    phone           VARCHAR,
    review_link     VARCHAR
);

-- ===========================================
-- VISITS (append-only duration records)
-- ===========================================
CREATE TABLE IF NOT EXISTS visits (
    id                  BIGINT PRIMARY KEY,
    site_id             VARCHAR NOT NULL,
    timestamp_ms        BIGINT NOT NULL,
    duration            BIGINT NOT NULL,             -- seconds
    source              VARCHAR NOT NULL,            -- referrer or 'direct'
    session_start_time  BIGINT                       -- join key to the session record
);
CREATE INDEX IF NOT EXISTS idx_visits_site ON visits(site_id, timestamp_ms);
"#
    )
}
