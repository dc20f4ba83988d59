use crate::models::{RatingSummary, RecipeRow};
use crate::{Database, OptionalExt};
use anyhow::Result;

impl Database {
    pub fn insert_recipe(
        &self,
        id: &str,
        author_id: &str,
        title: &str,
        summary: Option<&str>,
        ingredients: &str,
        instructions: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO recipes (id, author_id, title, summary, ingredients, instructions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, author_id, title, summary, ingredients, instructions],
            )?;
            Ok(())
        })
    }

    pub fn get_recipe(&self, id: &str) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, title, summary, ingredients, instructions, created_at
                 FROM recipes WHERE id = ?1",
            )?;
            stmt.query_row([id], map_recipe).optional()
        })
    }

    pub fn list_recipes_by_author(&self, author_id: &str) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, title, summary, ingredients, instructions, created_at
                 FROM recipes WHERE author_id = ?1
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([author_id], map_recipe)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_recipes_by_author(&self, author_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM recipes WHERE author_id = ?1",
                [author_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
    }

    /// Delete a recipe. Ratings, favorites and compliments go with it via
    /// the cascading foreign keys. Returns false when the recipe is absent.
    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Ratings --

    /// One rating per (recipe, user); re-rating replaces the value.
    pub fn upsert_rating(&self, recipe_id: &str, user_id: &str, value: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO ratings (recipe_id, user_id, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(recipe_id, user_id) DO UPDATE SET value = excluded.value",
                rusqlite::params![recipe_id, user_id, value],
            )?;
            Ok(())
        })
    }

    pub fn rating_summary(&self, recipe_id: &str) -> Result<RatingSummary> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT AVG(value), COUNT(*) FROM ratings WHERE recipe_id = ?1",
                [recipe_id],
                |row| {
                    Ok(RatingSummary {
                        average: row.get(0)?,
                        count: row.get(1)?,
                    })
                },
            )
            .map_err(Into::into)
        })
    }

    // -- Favorites --

    pub fn add_favorite(&self, recipe_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO favorites (recipe_id, user_id) VALUES (?1, ?2)",
                [recipe_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn remove_favorite(&self, recipe_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM favorites WHERE recipe_id = ?1 AND user_id = ?2",
                [recipe_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn favorite_count(&self, recipe_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM favorites WHERE recipe_id = ?1",
                [recipe_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
    }
}

fn map_recipe(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        summary: row.get(3)?,
        ingredients: row.get(4)?,
        instructions: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_recipe() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("a", "alice", "hash", None).unwrap();
        db.create_user("b", "bob", "hash", None).unwrap();
        db.insert_recipe(
            "r1",
            "a",
            "Shakshuka",
            Some("eggs in tomato sauce"),
            "eggs, tomatoes, peppers",
            "simmer sauce, poach eggs in it",
        )
        .unwrap();
        db
    }

    #[test]
    fn insert_and_fetch_recipe() {
        let db = db_with_recipe();
        let recipe = db.get_recipe("r1").unwrap().unwrap();
        assert_eq!(recipe.title, "Shakshuka");
        assert_eq!(recipe.author_id, "a");
        assert!(db.get_recipe("r2").unwrap().is_none());
        assert_eq!(db.count_recipes_by_author("a").unwrap(), 1);
        assert_eq!(db.count_recipes_by_author("b").unwrap(), 0);
    }

    #[test]
    fn author_listing_is_newest_first() {
        let db = db_with_recipe();
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO recipes (id, author_id, title, ingredients, instructions, created_at)
                 VALUES ('r2', 'a', 'Older', 'x', 'y', datetime('now', '-1 day'))",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let recipes = db.list_recipes_by_author("a").unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].id, "r1");
        assert_eq!(recipes[1].id, "r2");
    }

    #[test]
    fn rating_upsert_replaces_value() {
        let db = db_with_recipe();

        db.upsert_rating("r1", "b", 3).unwrap();
        db.upsert_rating("r1", "b", 5).unwrap();

        let summary = db.rating_summary("r1").unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.average, Some(5.0));

        let empty = db.rating_summary("r2").unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.average, None);
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let db = db_with_recipe();
        assert!(db.upsert_rating("r1", "b", 0).is_err());
        assert!(db.upsert_rating("r1", "b", 6).is_err());
    }

    #[test]
    fn favorites_are_idempotent() {
        let db = db_with_recipe();

        assert!(db.add_favorite("r1", "b").unwrap());
        assert!(!db.add_favorite("r1", "b").unwrap());
        assert_eq!(db.favorite_count("r1").unwrap(), 1);

        assert!(db.remove_favorite("r1", "b").unwrap());
        assert!(!db.remove_favorite("r1", "b").unwrap());
        assert_eq!(db.favorite_count("r1").unwrap(), 0);
    }

    #[test]
    fn delete_cascades_to_dependents() {
        let db = db_with_recipe();
        db.upsert_rating("r1", "b", 4).unwrap();
        db.add_favorite("r1", "b").unwrap();
        db.insert_compliment("c1", "r1", "b", "lovely").unwrap();

        assert!(db.delete_recipe("r1").unwrap());
        assert!(!db.delete_recipe("r1").unwrap());

        assert_eq!(db.rating_summary("r1").unwrap().count, 0);
        assert_eq!(db.favorite_count("r1").unwrap(), 0);
        assert!(db.get_compliment("c1").unwrap().is_none());
    }
}
