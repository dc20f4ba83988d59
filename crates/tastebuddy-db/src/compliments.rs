use crate::models::ComplimentRow;
use crate::{Database, OptionalExt};
use anyhow::Result;

impl Database {
    pub fn insert_compliment(
        &self,
        id: &str,
        recipe_id: &str,
        author_id: &str,
        body: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO compliments (id, recipe_id, author_id, body) VALUES (?1, ?2, ?3, ?4)",
                [id, recipe_id, author_id, body],
            )?;
            Ok(())
        })
    }

    pub fn get_compliment(&self, id: &str) -> Result<Option<ComplimentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipe_id, author_id, body, created_at, updated_at
                 FROM compliments WHERE id = ?1",
            )?;
            stmt.query_row([id], map_compliment).optional()
        })
    }

    /// Compliments on a recipe, oldest first (thread order).
    pub fn list_compliments_for_recipe(&self, recipe_id: &str) -> Result<Vec<ComplimentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipe_id, author_id, body, created_at, updated_at
                 FROM compliments WHERE recipe_id = ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map([recipe_id], map_compliment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_compliment_body(&self, id: &str, body: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE compliments SET body = ?2, updated_at = datetime('now') WHERE id = ?1",
                [id, body],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_compliment(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM compliments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn map_compliment(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComplimentRow> {
    Ok(ComplimentRow {
        id: row.get(0)?,
        recipe_id: row.get(1)?,
        author_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_recipe() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("a", "alice", "hash", None).unwrap();
        db.create_user("b", "bob", "hash", None).unwrap();
        db.insert_recipe("r1", "a", "Pho", None, "broth, noodles", "simmer for hours")
            .unwrap();
        db
    }

    #[test]
    fn compliment_crud() {
        let db = db_with_recipe();

        db.insert_compliment("c1", "r1", "b", "best pho outside Hanoi")
            .unwrap();

        let c = db.get_compliment("c1").unwrap().unwrap();
        assert_eq!(c.body, "best pho outside Hanoi");
        assert_eq!(c.author_id, "b");
        assert!(c.updated_at.is_none());

        assert!(db.update_compliment_body("c1", "still the best").unwrap());
        let c = db.get_compliment("c1").unwrap().unwrap();
        assert_eq!(c.body, "still the best");
        assert!(c.updated_at.is_some());

        assert!(db.delete_compliment("c1").unwrap());
        assert!(!db.delete_compliment("c1").unwrap());
        assert!(db.get_compliment("c1").unwrap().is_none());
    }

    #[test]
    fn recipe_listing_is_oldest_first() {
        let db = db_with_recipe();
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO compliments (id, recipe_id, author_id, body, created_at)
                 VALUES ('c0', 'r1', 'b', 'early bird', datetime('now', '-1 hour'))",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        db.insert_compliment("c1", "r1", "b", "late to the party")
            .unwrap();

        let list = db.list_compliments_for_recipe("r1").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "c0");
        assert_eq!(list[1].id, "c1");

        assert!(db.list_compliments_for_recipe("r2").unwrap().is_empty());
    }

    #[test]
    fn unknown_recipe_is_rejected() {
        let db = db_with_recipe();
        assert!(db.insert_compliment("c1", "missing", "b", "hi").is_err());
    }
}
