//! Category and product membership repository.

use curfew_core::{Category, ProductId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Repository for categories and the products assigned to them.
pub struct CategoriesRepo;

impl CategoriesRepo {
    /// Insert or rename a category. New categories go to the end of the list.
    pub fn upsert(conn: &Connection, category: &Category) -> Result<()> {
        conn.execute(
            "INSERT INTO categories (slug, name, position)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM categories))
             ON CONFLICT(slug) DO UPDATE SET name = ?2",
            params![category.slug, category.name],
        )?;
        Ok(())
    }

    /// Get a category by slug.
    pub fn get(conn: &Connection, slug: &str) -> Result<Option<Category>> {
        let category = conn
            .query_row(
                "SELECT slug, name FROM categories WHERE slug = ?1",
                [slug],
                |row| {
                    Ok(Category {
                        slug: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    /// Get all categories in list order.
    pub fn get_all(conn: &Connection) -> Result<Vec<Category>> {
        let mut stmt = conn.prepare("SELECT slug, name FROM categories ORDER BY position, slug")?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    slug: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Delete a category and its product assignments.
    pub fn delete(conn: &Connection, slug: &str) -> Result<bool> {
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM product_categories WHERE slug = ?1", [slug])?;
        let deleted = tx.execute("DELETE FROM categories WHERE slug = ?1", [slug])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Replace a product's categories with `slugs`, in order.
    pub fn assign_product(conn: &Connection, product_id: ProductId, slugs: &[String]) -> Result<()> {
        let id = product_id as i64;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM product_categories WHERE product_id = ?1", [id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO product_categories (product_id, slug, position)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (position, slug) in slugs.iter().enumerate() {
                stmt.execute(params![id, slug, position as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Categories assigned to a product, in assignment order.
    ///
    /// Slugs without a category row are reported with the slug as name.
    pub fn get_for_product(conn: &Connection, product_id: ProductId) -> Result<Vec<Category>> {
        let mut stmt = conn.prepare(
            "SELECT pc.slug, COALESCE(c.name, pc.slug)
             FROM product_categories pc
             LEFT JOIN categories c ON c.slug = pc.slug
             WHERE pc.product_id = ?1
             ORDER BY pc.position",
        )?;

        let categories = stmt
            .query_map([product_id as i64], |row| {
                Ok(Category {
                    slug: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }
}
