use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                TEXT PRIMARY KEY,
            username          TEXT NOT NULL UNIQUE,
            password          TEXT NOT NULL,
            display_name      TEXT,
            bio               TEXT,
            email             TEXT,
            email_visibility  TEXT NOT NULL DEFAULT 'hidden'
                CHECK (email_visibility IN ('hidden', 'following_only', 'public')),
            is_admin          INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS follows (
            follower_id   TEXT NOT NULL REFERENCES users(id),
            following_id  TEXT NOT NULL REFERENCES users(id),
            created_at    TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (follower_id, following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_following
            ON follows(following_id, created_at);

        CREATE TABLE IF NOT EXISTS recipes (
            id            TEXT PRIMARY KEY,
            author_id     TEXT NOT NULL REFERENCES users(id),
            title         TEXT NOT NULL,
            summary       TEXT,
            ingredients   TEXT NOT NULL,
            instructions  TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_author
            ON recipes(author_id, created_at);

        CREATE TABLE IF NOT EXISTS ratings (
            recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            value       INTEGER NOT NULL CHECK (value BETWEEN 1 AND 5),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (recipe_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS favorites (
            recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (recipe_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS compliments (
            id          TEXT PRIMARY KEY,
            recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_compliments_recipe
            ON compliments(recipe_id, created_at);

        -- definitions are found by (name, kind) lookup, not a unique constraint
        CREATE TABLE IF NOT EXISTS achievements (
            id           TEXT PRIMARY KEY,
            kind         TEXT NOT NULL,
            name         TEXT NOT NULL,
            description  TEXT NOT NULL,
            icon         TEXT NOT NULL,
            color        TEXT NOT NULL,
            threshold    INTEGER,
            is_active    INTEGER NOT NULL DEFAULT 1,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_achievements_name_kind
            ON achievements(name, kind);

        CREATE TABLE IF NOT EXISTS user_achievements (
            user_id         TEXT NOT NULL REFERENCES users(id),
            achievement_id  TEXT NOT NULL REFERENCES achievements(id),
            earned_at       TEXT NOT NULL DEFAULT (datetime('now')),
            progress        INTEGER,
            PRIMARY KEY (user_id, achievement_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
