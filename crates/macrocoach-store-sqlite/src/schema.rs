//! SQL schema for the MacroCoach SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per profile version. Updates insert a new version.
CREATE TABLE IF NOT EXISTS profiles (
    user_id             TEXT    NOT NULL,
    version             INTEGER NOT NULL,
    sex                 TEXT    NOT NULL,
    age                 INTEGER NOT NULL,
    height_cm           REAL    NOT NULL,
    weight_kg           REAL    NOT NULL,
    activity_level      TEXT    NOT NULL,
    goal                TEXT    NOT NULL,
    dietary_preferences TEXT    NOT NULL DEFAULT '[]',  -- JSON array
    recorded_at         TEXT    NOT NULL,
    PRIMARY KEY (user_id, version)
);

-- Samples are strictly append-only. `seq` orders writes so that duplicate
-- timestamps resolve to the sample written last.
CREATE TABLE IF NOT EXISTS metrics (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    sample_id       TEXT    NOT NULL UNIQUE,
    user_id         TEXT    NOT NULL,
    timestamp       TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    source          TEXT,
    recorded_at     TEXT    NOT NULL,   -- server-assigned
    kcal_out        REAL,
    kcal_in         REAL,
    heart_rate      INTEGER,
    steps           INTEGER,
    sleep_score     INTEGER,
    weight_kg       REAL,
    protein_g       REAL,
    carbs_g         REAL,
    fat_g           REAL,
    workout_type    TEXT,
    rpe             INTEGER,
    workout_minutes INTEGER
);

CREATE TABLE IF NOT EXISTS macro_targets (
    seq               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id           TEXT NOT NULL,
    date              TEXT NOT NULL,   -- YYYY-MM-DD
    kcal_target       REAL NOT NULL,
    protein_g_target  REAL NOT NULL,
    carbs_g_target    REAL NOT NULL,
    fat_g_target      REAL NOT NULL,
    bmr               REAL NOT NULL,
    tdee              REAL NOT NULL,
    observed_kcal_out REAL,
    target_steps      INTEGER NOT NULL DEFAULT 0,
    workout_minutes   INTEGER NOT NULL DEFAULT 0,
    computed_at       TEXT NOT NULL
);

-- Meals are written once as 'proposed'; status changes live in
-- meal_transitions.
CREATE TABLE IF NOT EXISTS meals (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    meal_id        TEXT    NOT NULL UNIQUE,
    user_id        TEXT    NOT NULL,
    date           TEXT    NOT NULL,
    name           TEXT    NOT NULL,
    meal_type      TEXT    NOT NULL,
    kcal           REAL    NOT NULL,
    protein_g      REAL    NOT NULL,
    carbs_g        REAL    NOT NULL,
    fat_g          REAL    NOT NULL,
    cuisine        TEXT,
    ingredients    TEXT    NOT NULL DEFAULT '[]',  -- JSON
    instructions   TEXT    NOT NULL DEFAULT '[]',  -- JSON
    low_confidence INTEGER NOT NULL DEFAULT 0,
    provenance     TEXT    NOT NULL,               -- JSON
    replaces       TEXT    REFERENCES meals(meal_id),
    created_at     TEXT    NOT NULL
);

-- A meal leaves 'proposed' at most once.
CREATE TABLE IF NOT EXISTS meal_transitions (
    meal_id        TEXT NOT NULL REFERENCES meals(meal_id),
    status         TEXT NOT NULL,
    replacement_id TEXT,
    recorded_at    TEXT NOT NULL,
    UNIQUE (meal_id),
    CHECK  (status IN ('accepted', 'swapped'))
);

CREATE TABLE IF NOT EXISTS chat_turns (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    turn_id     TEXT NOT NULL UNIQUE,
    user_id     TEXT NOT NULL,
    message     TEXT NOT NULL,
    reply       TEXT NOT NULL,
    command     TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS metrics_user_ts_idx  ON metrics(user_id, timestamp);
CREATE INDEX IF NOT EXISTS targets_user_idx     ON macro_targets(user_id);
CREATE INDEX IF NOT EXISTS meals_user_date_idx  ON meals(user_id, date);
CREATE INDEX IF NOT EXISTS turns_user_idx       ON chat_turns(user_id);

PRAGMA user_version = 1;
";
