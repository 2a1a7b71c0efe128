mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

const PROJECT_COLUMNS: &str = "id, user_id, title, doc_type, context, created_at";
const SECTION_COLUMNS: &str = "id, project_id, heading, content, sort_order, feedback, comments";

/// Project/section store backed by a single SQLite connection.
///
/// Every write is committed on its own, except project creation which inserts
/// the project and all of its placeholder sections in one transaction.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "docgen")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("docgen.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Bring the schema up to date. Returns the migration versions applied by this call.
    pub fn migrate(&self) -> Result<Vec<&'static str>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    /// Insert a user. Returns `None` when the email is already registered.
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        let rows = conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(email) DO NOTHING",
            (id.to_string(), email, password_hash, now.to_rfc3339()),
        )?;

        if rows == 0 {
            return Ok(None);
        }

        Ok(Some(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        }))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
                [email],
                |row| {
                    Ok(User {
                        id: parse_uuid(row.get::<_, String>(0)?),
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        created_at: parse_datetime(row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    // ============================================================
    // Project operations
    // ============================================================

    /// Create a project and one placeholder section per outline heading.
    ///
    /// Sections get orders `0..outline.len()` and [`PENDING_CONTENT`]. The
    /// transaction is committed before this returns, so a pipeline started
    /// afterwards always finds its rows.
    pub fn create_project(
        &self,
        user_id: Uuid,
        input: CreateProjectInput,
    ) -> Result<ProjectWithSections> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO projects (id, user_id, title, doc_type, context, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                user_id.to_string(),
                &input.title,
                input.doc_type.as_str(),
                &input.context,
                now.to_rfc3339(),
            ),
        )?;

        let mut sections = Vec::with_capacity(input.outline.len());
        for (order, heading) in input.outline.into_iter().enumerate() {
            let section_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO sections (id, project_id, heading, content, sort_order)
                 VALUES (?, ?, ?, ?, ?)",
                (
                    section_id.to_string(),
                    id.to_string(),
                    &heading,
                    PENDING_CONTENT,
                    order as i64,
                ),
            )?;
            sections.push(Section {
                id: section_id,
                project_id: id,
                heading,
                content: PENDING_CONTENT.to_string(),
                order: order as i64,
                feedback: FeedbackTag::None,
                comments: String::new(),
                state: SectionState::Pending,
            });
        }

        tx.commit()?;

        Ok(ProjectWithSections {
            project: Project {
                id,
                user_id,
                title: input.title,
                doc_type: input.doc_type,
                context: input.context,
                created_at: now,
            },
            sections,
        })
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
                [id.to_string()],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    /// All projects owned by a user, newest first, each with its sections.
    pub fn get_projects_for_user(&self, user_id: Uuid) -> Result<Vec<ProjectWithSections>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ? ORDER BY created_at DESC"
        ))?;
        let projects = stmt
            .query_map([user_id.to_string()], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        // get_sections takes the lock again
        drop(stmt);
        drop(conn);

        projects
            .into_iter()
            .map(|project| {
                let sections = self.get_sections(project.id)?;
                Ok(ProjectWithSections { project, sections })
            })
            .collect()
    }

    pub fn get_project_with_sections(&self, id: Uuid) -> Result<Option<ProjectWithSections>> {
        let Some(project) = self.get_project(id)? else {
            return Ok(None);
        };
        let sections = self.get_sections(id)?;
        Ok(Some(ProjectWithSections { project, sections }))
    }

    /// Like [`Database::get_project_with_sections`], but `None` unless `user_id` owns it.
    pub fn get_project_for_user(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectWithSections>> {
        Ok(self
            .get_project_with_sections(id)?
            .filter(|p| p.project.user_id == user_id))
    }

    pub fn delete_project(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM projects WHERE id = ? AND user_id = ?",
            [id.to_string(), user_id.to_string()],
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Section operations
    // ============================================================

    /// Sections of a project sorted by `order`.
    pub fn get_sections(&self, project_id: Uuid) -> Result<Vec<Section>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE project_id = ? ORDER BY sort_order"
        ))?;
        let sections = stmt
            .query_map([project_id.to_string()], section_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sections)
    }

    pub fn get_section(&self, id: Uuid) -> Result<Option<Section>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let section = conn
            .query_row(
                &format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = ?"),
                [id.to_string()],
                section_from_row,
            )
            .optional()?;
        Ok(section)
    }

    pub fn set_section_content(&self, id: Uuid, content: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE sections SET content = ? WHERE id = ?",
            (content, id.to_string()),
        )?;
        Ok(rows > 0)
    }

    /// Update the section at `order` within a project.
    ///
    /// Returns `false` if the row is gone, e.g. the project was deleted while
    /// its pipeline was still running.
    pub fn set_section_content_by_order(
        &self,
        project_id: Uuid,
        order: i64,
        content: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE sections SET content = ? WHERE project_id = ? AND sort_order = ?",
            (content, project_id.to_string(), order),
        )?;
        Ok(rows > 0)
    }

    pub fn set_section_feedback(
        &self,
        id: Uuid,
        feedback: &FeedbackTag,
        comments: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE sections SET feedback = ?, comments = ? WHERE id = ?",
            (feedback.as_str(), comments, id.to_string()),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        user_id: parse_uuid(row.get::<_, String>(1)?),
        title: row.get(2)?,
        doc_type: DocType::from_str(&row.get::<_, String>(3)?).unwrap_or(DocType::Report),
        context: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn section_from_row(row: &Row<'_>) -> rusqlite::Result<Section> {
    let content: String = row.get(3)?;
    Ok(Section {
        id: parse_uuid(row.get::<_, String>(0)?),
        project_id: parse_uuid(row.get::<_, String>(1)?),
        heading: row.get(2)?,
        state: SectionState::of(&content),
        content,
        order: row.get(4)?,
        feedback: FeedbackTag::from(row.get::<_, String>(5)?),
        comments: row.get(6)?,
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
