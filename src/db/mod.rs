use crate::config::Config;
use rusqlite::{Connection, OptionalExtension, Result, Row};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone)]
pub struct FactionRecord {
    pub id: i64,
    pub guild_id: String,
    pub name: String,
    pub prefix: String,
    pub timezone: String,
    pub admin_role_id: Option<String>,
    pub meeting_channel_id: Option<String>,
    pub radio_channel_id: Option<String>,
    pub voting_channel_id: Option<String>,
    pub fine_log_channel_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub id: i64,
    pub faction_id: i64,
    pub user_id: String,
    pub role: String,
    pub joined_at: String,
    pub phone: Option<String>,
    pub handle: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FineRecord {
    pub id: i64,
    pub faction_id: i64,
    pub user_id: String,
    pub issuer_id: String,
    pub amount: i64,
    pub reason: String,
    pub paid: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MeetingRecord {
    pub id: i64,
    pub faction_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: String,
    pub created_by: String,
    pub emergency: bool,
    pub channel_id: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PollRecord {
    pub id: i64,
    pub faction_id: i64,
    pub creator_id: String,
    pub question: String,
    pub options: String,
    pub end_time: String,
    pub closed: bool,
    pub winner: Option<String>,
    pub total_votes: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RadioRecord {
    pub faction_id: i64,
    pub frequency: String,
    pub format: String,
    pub updated_by: String,
    pub updated_at: String,
}

/// Column values for a new faction row
pub struct NewFaction<'a> {
    pub guild_id: &'a str,
    pub name: &'a str,
    pub prefix: &'a str,
    pub timezone: &'a str,
    pub admin_role_id: &'a str,
    pub meeting_channel_id: &'a str,
    pub radio_channel_id: &'a str,
    pub voting_channel_id: &'a str,
    pub fine_log_channel_id: &'a str,
}

fn faction_from_row(row: &Row<'_>) -> Result<FactionRecord> {
    Ok(FactionRecord {
        id: row.get(0)?,
        guild_id: row.get(1)?,
        name: row.get(2)?,
        prefix: row.get(3)?,
        timezone: row.get(4)?,
        admin_role_id: row.get(5)?,
        meeting_channel_id: row.get(6)?,
        radio_channel_id: row.get(7)?,
        voting_channel_id: row.get(8)?,
        fine_log_channel_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn member_from_row(row: &Row<'_>) -> Result<MemberRecord> {
    Ok(MemberRecord {
        id: row.get(0)?,
        faction_id: row.get(1)?,
        user_id: row.get(2)?,
        role: row.get(3)?,
        joined_at: row.get(4)?,
        phone: row.get(5)?,
        handle: row.get(6)?,
    })
}

fn fine_from_row(row: &Row<'_>) -> Result<FineRecord> {
    Ok(FineRecord {
        id: row.get(0)?,
        faction_id: row.get(1)?,
        user_id: row.get(2)?,
        issuer_id: row.get(3)?,
        amount: row.get(4)?,
        reason: row.get(5)?,
        paid: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn meeting_from_row(row: &Row<'_>) -> Result<MeetingRecord> {
    Ok(MeetingRecord {
        id: row.get(0)?,
        faction_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        scheduled_at: row.get(4)?,
        created_by: row.get(5)?,
        emergency: row.get(6)?,
        channel_id: row.get(7)?,
        message_id: row.get(8)?,
    })
}

const FACTION_COLS: &str = "id, guild_id, name, prefix, timezone, admin_role_id, \
     meeting_channel_id, radio_channel_id, voting_channel_id, fine_log_channel_id, created_at";
const MEMBER_COLS: &str = "id, faction_id, user_id, role, joined_at, phone, handle";
const FINE_COLS: &str = "id, faction_id, user_id, issuer_id, amount, reason, paid, created_at";
const MEETING_COLS: &str =
    "id, faction_id, title, description, scheduled_at, created_by, emergency, channel_id, message_id";

impl Database {
    pub fn new(config: &Config) -> Result<Self> {
        let conn = Connection::open(&config.database_url)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> anyhow::Result<()> {
        info!("Database: Initializing schema...");
        let sql = "
            CREATE TABLE IF NOT EXISTS factions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                prefix TEXT NOT NULL,
                timezone TEXT NOT NULL,
                admin_role_id TEXT,
                meeting_channel_id TEXT,
                radio_channel_id TEXT,
                voting_channel_id TEXT,
                fine_log_channel_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS faction_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                faction_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                joined_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                phone TEXT,
                handle TEXT,
                UNIQUE (faction_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS fines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                faction_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                issuer_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                reason TEXT NOT NULL,
                paid BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_fines_faction_date ON fines (faction_id, created_at);

            CREATE TABLE IF NOT EXISTS meetings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                faction_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                scheduled_at DATETIME NOT NULL,
                created_by TEXT NOT NULL,
                emergency BOOLEAN NOT NULL DEFAULT FALSE,
                channel_id TEXT,
                message_id TEXT
            );

            CREATE TABLE IF NOT EXISTS meeting_attendance (
                meeting_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (meeting_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS polls (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                faction_id INTEGER NOT NULL,
                creator_id TEXT NOT NULL,
                question TEXT NOT NULL,
                options TEXT NOT NULL,
                end_time DATETIME NOT NULL,
                closed BOOLEAN NOT NULL DEFAULT FALSE,
                winner TEXT,
                total_votes INTEGER
            );

            CREATE TABLE IF NOT EXISTS poll_votes (
                poll_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                option_index INTEGER NOT NULL,
                voted_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (poll_id, user_id)
            );

            CREATE TABLE IF NOT EXISTS radio_settings (
                faction_id INTEGER PRIMARY KEY,
                frequency TEXT NOT NULL,
                format TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
        ";
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(sql)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    // --- Factions ---

    pub fn create_faction(&self, faction: &NewFaction<'_>) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO factions (guild_id, name, prefix, timezone, admin_role_id,
                 meeting_channel_id, radio_channel_id, voting_channel_id, fine_log_channel_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            (
                faction.guild_id,
                faction.name,
                faction.prefix,
                faction.timezone,
                faction.admin_role_id,
                faction.meeting_channel_id,
                faction.radio_channel_id,
                faction.voting_channel_id,
                faction.fine_log_channel_id,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_faction_by_guild(&self, guild_id: &str) -> anyhow::Result<Option<FactionRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {FACTION_COLS} FROM factions WHERE guild_id = ?1");
        let faction = conn
            .query_row(&sql, [guild_id], faction_from_row)
            .optional()?;
        Ok(faction)
    }

    pub fn update_faction_prefix(&self, faction_id: i64, prefix: &str) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE factions SET prefix = ?2 WHERE id = ?1",
            (faction_id, prefix),
        )?;
        Ok(rows)
    }

    pub fn update_faction_timezone(
        &self,
        faction_id: i64,
        timezone: &str,
    ) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE factions SET timezone = ?2 WHERE id = ?1",
            (faction_id, timezone),
        )?;
        Ok(rows)
    }

    pub fn update_faction_admin_role(
        &self,
        faction_id: i64,
        role_id: &str,
    ) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE factions SET admin_role_id = ?2 WHERE id = ?1",
            (faction_id, role_id),
        )?;
        Ok(rows)
    }

    /// Partial channel update: fields left as `None` keep their current value.
    pub fn update_faction_channels(
        &self,
        faction_id: i64,
        meeting: Option<&str>,
        radio: Option<&str>,
        voting: Option<&str>,
        fine_log: Option<&str>,
    ) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE factions SET
                 meeting_channel_id = COALESCE(?2, meeting_channel_id),
                 radio_channel_id = COALESCE(?3, radio_channel_id),
                 voting_channel_id = COALESCE(?4, voting_channel_id),
                 fine_log_channel_id = COALESCE(?5, fine_log_channel_id)
             WHERE id = ?1",
            (faction_id, meeting, radio, voting, fine_log),
        )?;
        Ok(rows)
    }

    // --- Members ---

    pub fn add_member(&self, faction_id: i64, user_id: &str, role: &str) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO faction_members (faction_id, user_id, role) VALUES (?1, ?2, ?3)",
            (faction_id, user_id, role),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_member(&self, faction_id: i64, user_id: &str) -> anyhow::Result<Option<MemberRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql =
            format!("SELECT {MEMBER_COLS} FROM faction_members WHERE faction_id = ?1 AND user_id = ?2");
        let member = conn
            .query_row(&sql, (faction_id, user_id), member_from_row)
            .optional()?;
        Ok(member)
    }

    /// Partial contact update: fields left as `None` keep their current value.
    pub fn update_member_contact(
        &self,
        faction_id: i64,
        user_id: &str,
        phone: Option<&str>,
        handle: Option<&str>,
    ) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE faction_members SET
                 phone = COALESCE(?3, phone),
                 handle = COALESCE(?4, handle)
             WHERE faction_id = ?1 AND user_id = ?2",
            (faction_id, user_id, phone, handle),
        )?;
        Ok(rows)
    }

    // --- Fines ---

    pub fn create_fine(
        &self,
        faction_id: i64,
        user_id: &str,
        issuer_id: &str,
        amount: i64,
        reason: &str,
    ) -> anyhow::Result<i64> {
        debug!(
            "Database: Creating fine of {} for user {} in faction {}",
            amount, user_id, faction_id
        );
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO fines (faction_id, user_id, issuer_id, amount, reason)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (faction_id, user_id, issuer_id, amount, reason),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_fine(&self, fine_id: i64, faction_id: i64) -> anyhow::Result<Option<FineRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {FINE_COLS} FROM fines WHERE id = ?1 AND faction_id = ?2");
        let fine = conn
            .query_row(&sql, (fine_id, faction_id), fine_from_row)
            .optional()?;
        Ok(fine)
    }

    pub fn list_fines(
        &self,
        faction_id: i64,
        user_id: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<FineRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {FINE_COLS} FROM fines
             WHERE faction_id = ?1 AND (?2 IS NULL OR user_id = ?2)
             ORDER BY created_at DESC, id DESC LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map((faction_id, user_id, limit), fine_from_row)?;

        let mut fines = Vec::new();
        for row in rows {
            fines.push(row?);
        }
        Ok(fines)
    }

    pub fn delete_fine(&self, fine_id: i64, faction_id: i64) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM fines WHERE id = ?1 AND faction_id = ?2",
            (fine_id, faction_id),
        )?;
        Ok(rows)
    }

    pub fn count_fines(&self, faction_id: i64, user_id: &str) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM fines WHERE faction_id = ?1 AND user_id = ?2",
            (faction_id, user_id),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // --- Meetings ---

    pub fn create_meeting(
        &self,
        faction_id: i64,
        title: &str,
        description: Option<&str>,
        scheduled_at: &str,
        created_by: &str,
        emergency: bool,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO meetings (faction_id, title, description, scheduled_at, created_by, emergency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (faction_id, title, description, scheduled_at, created_by, emergency),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_meeting_message(
        &self,
        meeting_id: i64,
        faction_id: i64,
        channel_id: &str,
        message_id: &str,
    ) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE meetings SET channel_id = ?3, message_id = ?4
             WHERE id = ?1 AND faction_id = ?2",
            (meeting_id, faction_id, channel_id, message_id),
        )?;
        Ok(rows)
    }

    pub fn get_meeting(
        &self,
        meeting_id: i64,
        faction_id: i64,
    ) -> anyhow::Result<Option<MeetingRecord>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {MEETING_COLS} FROM meetings WHERE id = ?1 AND faction_id = ?2");
        let meeting = conn
            .query_row(&sql, (meeting_id, faction_id), meeting_from_row)
            .optional()?;
        Ok(meeting)
    }

    /// Deletes a meeting and its attendance rows. Returns deleted meeting count (0 or 1).
    pub fn delete_meeting(&self, meeting_id: i64, faction_id: i64) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM meetings WHERE id = ?1 AND faction_id = ?2",
            (meeting_id, faction_id),
        )?;
        if rows > 0 {
            conn.execute(
                "DELETE FROM meeting_attendance WHERE meeting_id = ?1",
                (meeting_id,),
            )?;
        }
        Ok(rows)
    }

    pub fn upsert_attendance(
        &self,
        meeting_id: i64,
        user_id: &str,
        status: &str,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO meeting_attendance (meeting_id, user_id, status, updated_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(meeting_id, user_id) DO UPDATE SET status = ?3, updated_at = CURRENT_TIMESTAMP",
            (meeting_id, user_id, status),
        )?;
        Ok(())
    }

    pub fn attendance_counts(&self, meeting_id: i64) -> anyhow::Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM meeting_attendance WHERE meeting_id = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map((meeting_id,), |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    /// Per-status attendance tallies for one user across a faction's meetings.
    pub fn attendance_stats(
        &self,
        faction_id: i64,
        user_id: &str,
    ) -> anyhow::Result<Vec<(String, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT a.status, COUNT(*)
             FROM meeting_attendance a
             JOIN meetings m ON m.id = a.meeting_id
             WHERE m.faction_id = ?1 AND a.user_id = ?2
             GROUP BY a.status",
        )?;
        let rows = stmt.query_map((faction_id, user_id), |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    // --- Polls ---

    pub fn create_poll(
        &self,
        faction_id: i64,
        creator_id: &str,
        question: &str,
        options_json: &str,
        end_time: &str,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO polls (faction_id, creator_id, question, options, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (faction_id, creator_id, question, options_json, end_time),
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// One vote per (poll, user); a later vote overwrites the earlier one.
    pub fn record_poll_vote(
        &self,
        poll_id: i64,
        user_id: &str,
        option_index: usize,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO poll_votes (poll_id, user_id, option_index, voted_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(poll_id, user_id) DO UPDATE SET option_index = ?3, voted_at = CURRENT_TIMESTAMP",
            (poll_id, user_id, option_index),
        )?;
        Ok(())
    }

    /// Vote counts per option index, zero-filled to `option_count`.
    pub fn poll_tallies(&self, poll_id: i64, option_count: usize) -> anyhow::Result<Vec<u64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT option_index, COUNT(*) FROM poll_votes WHERE poll_id = ?1 GROUP BY option_index",
        )?;
        let rows = stmt.query_map((poll_id,), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut tallies = vec![0u64; option_count];
        for row in rows {
            let (index, count) = row?;
            if let Some(slot) = tallies.get_mut(index as usize) {
                *slot = count as u64;
            }
        }
        Ok(tallies)
    }

    /// Records the finalized result. The `closed` guard makes closure one-shot.
    pub fn close_poll(
        &self,
        poll_id: i64,
        faction_id: i64,
        winner: &str,
        total_votes: i64,
    ) -> anyhow::Result<usize> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE polls SET closed = TRUE, winner = ?3, total_votes = ?4
             WHERE id = ?1 AND faction_id = ?2 AND closed = FALSE",
            (poll_id, faction_id, winner, total_votes),
        )?;
        Ok(rows)
    }

    pub fn get_poll(&self, poll_id: i64, faction_id: i64) -> anyhow::Result<Option<PollRecord>> {
        let conn = self.conn.lock().unwrap();
        let poll = conn
            .query_row(
                "SELECT id, faction_id, creator_id, question, options, end_time, closed, winner, total_votes
                 FROM polls WHERE id = ?1 AND faction_id = ?2",
                (poll_id, faction_id),
                |row| {
                    Ok(PollRecord {
                        id: row.get(0)?,
                        faction_id: row.get(1)?,
                        creator_id: row.get(2)?,
                        question: row.get(3)?,
                        options: row.get(4)?,
                        end_time: row.get(5)?,
                        closed: row.get(6)?,
                        winner: row.get(7)?,
                        total_votes: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(poll)
    }

    // --- Radio ---

    pub fn upsert_radio(
        &self,
        faction_id: i64,
        frequency: &str,
        format: &str,
        updated_by: &str,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO radio_settings (faction_id, frequency, format, updated_by, updated_at)
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
             ON CONFLICT(faction_id) DO UPDATE SET
                 frequency = ?2, format = ?3, updated_by = ?4, updated_at = CURRENT_TIMESTAMP",
            (faction_id, frequency, format, updated_by),
        )?;
        Ok(())
    }

    pub fn get_radio(&self, faction_id: i64) -> anyhow::Result<Option<RadioRecord>> {
        let conn = self.conn.lock().unwrap();
        let radio = conn
            .query_row(
                "SELECT faction_id, frequency, format, updated_by, updated_at
                 FROM radio_settings WHERE faction_id = ?1",
                (faction_id,),
                |row| {
                    Ok(RadioRecord {
                        faction_id: row.get(0)?,
                        frequency: row.get(1)?,
                        format: row.get(2)?,
                        updated_by: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(radio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            discord_token: "test".to_string(),
            application_id: 0,
            database_url: ":memory:".to_string(),
            status_message: "test".to_string(),
            dev_guild_id: None,
        }
    }

    fn test_db() -> Database {
        let db = Database::new(&test_config()).unwrap();
        db.execute_init().unwrap();
        db
    }

    fn seed_faction(db: &Database, guild_id: &str) -> i64 {
        db.create_faction(&NewFaction {
            guild_id,
            name: "Night Watch",
            prefix: "!",
            timezone: "America/New_York",
            admin_role_id: "900",
            meeting_channel_id: "101",
            radio_channel_id: "102",
            voting_channel_id: "103",
            fine_log_channel_id: "104",
        })
        .unwrap()
    }

    #[test]
    fn test_faction_roundtrip_and_uniqueness() {
        let db = test_db();
        let id = seed_faction(&db, "g1");

        let faction = db.get_faction_by_guild("g1").unwrap().unwrap();
        assert_eq!(faction.id, id);
        assert_eq!(faction.name, "Night Watch");
        assert_eq!(faction.timezone, "America/New_York");
        assert!(db.get_faction_by_guild("g2").unwrap().is_none());

        // Second faction for the same guild violates the unique constraint
        let dup = db.create_faction(&NewFaction {
            guild_id: "g1",
            name: "Copycats",
            prefix: "?",
            timezone: "UTC",
            admin_role_id: "901",
            meeting_channel_id: "201",
            radio_channel_id: "202",
            voting_channel_id: "203",
            fine_log_channel_id: "204",
        });
        assert!(dup.is_err());
    }

    #[test]
    fn test_faction_updates_are_partial() {
        let db = test_db();
        let id = seed_faction(&db, "g1");

        db.update_faction_prefix(id, "$").unwrap();
        db.update_faction_timezone(id, "Europe/Berlin").unwrap();
        db.update_faction_channels(id, Some("111"), None, None, Some("114"))
            .unwrap();

        let faction = db.get_faction_by_guild("g1").unwrap().unwrap();
        assert_eq!(faction.prefix, "$");
        assert_eq!(faction.timezone, "Europe/Berlin");
        assert_eq!(faction.meeting_channel_id.as_deref(), Some("111"));
        // Untouched fields keep their values
        assert_eq!(faction.radio_channel_id.as_deref(), Some("102"));
        assert_eq!(faction.voting_channel_id.as_deref(), Some("103"));
        assert_eq!(faction.fine_log_channel_id.as_deref(), Some("114"));
    }

    #[test]
    fn test_members() {
        let db = test_db();
        let fid = seed_faction(&db, "g1");

        db.add_member(fid, "u1", "LEADER").unwrap();
        let member = db.get_member(fid, "u1").unwrap().unwrap();
        assert_eq!(member.role, "LEADER");
        assert!(member.phone.is_none());

        // One membership per (faction, user)
        assert!(db.add_member(fid, "u1", "MEMBER").is_err());

        // Partial contact update preserves the other field
        db.update_member_contact(fid, "u1", Some("+1 555 0100"), None)
            .unwrap();
        db.update_member_contact(fid, "u1", None, Some("@crow"))
            .unwrap();
        let member = db.get_member(fid, "u1").unwrap().unwrap();
        assert_eq!(member.phone.as_deref(), Some("+1 555 0100"));
        assert_eq!(member.handle.as_deref(), Some("@crow"));
    }

    #[test]
    fn test_fines_scoped_by_faction() {
        let db = test_db();
        let f1 = seed_faction(&db, "g1");
        let f2 = seed_faction(&db, "g2");

        let fine_id = db.create_fine(f1, "u1", "u9", 500, "late to muster").unwrap();
        db.create_fine(f1, "u2", "u9", 250, "lost a sword").unwrap();

        assert!(db.get_fine(fine_id, f1).unwrap().is_some());
        // Cross-faction lookups and deletes miss
        assert!(db.get_fine(fine_id, f2).unwrap().is_none());
        assert_eq!(db.delete_fine(fine_id, f2).unwrap(), 0);

        let all = db.list_fines(f1, None, 10).unwrap();
        assert_eq!(all.len(), 2);
        let filtered = db.list_fines(f1, Some("u1"), 10).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].amount, 500);
        assert!(!filtered[0].paid);

        assert_eq!(db.count_fines(f1, "u1").unwrap(), 1);
        assert_eq!(db.delete_fine(fine_id, f1).unwrap(), 1);
        assert_eq!(db.count_fines(f1, "u1").unwrap(), 0);
    }

    #[test]
    fn test_meetings_and_attendance() {
        let db = test_db();
        let fid = seed_faction(&db, "g1");

        let mid = db
            .create_meeting(fid, "War council", Some("bring maps"), "2026-09-01 18:00:00", "u1", false)
            .unwrap();
        db.set_meeting_message(mid, fid, "101", "555").unwrap();

        let meeting = db.get_meeting(mid, fid).unwrap().unwrap();
        assert_eq!(meeting.title, "War council");
        assert_eq!(meeting.message_id.as_deref(), Some("555"));
        assert!(!meeting.emergency);

        // Last write wins per (meeting, user)
        db.upsert_attendance(mid, "u2", "MAYBE").unwrap();
        db.upsert_attendance(mid, "u2", "ATTENDING").unwrap();
        db.upsert_attendance(mid, "u3", "DECLINED").unwrap();

        let counts = db.attendance_counts(mid).unwrap();
        assert!(counts.contains(&("ATTENDING".to_string(), 1)));
        assert!(counts.contains(&("DECLINED".to_string(), 1)));
        assert!(!counts.iter().any(|(status, _)| status == "MAYBE"));

        let stats = db.attendance_stats(fid, "u2").unwrap();
        assert_eq!(stats, vec![("ATTENDING".to_string(), 1)]);

        // Deleting the meeting removes attendance with it
        assert_eq!(db.delete_meeting(mid, fid).unwrap(), 1);
        assert!(db.get_meeting(mid, fid).unwrap().is_none());
        assert!(db.attendance_counts(mid).unwrap().is_empty());
    }

    #[test]
    fn test_poll_vote_overwrite_and_close_once() {
        let db = test_db();
        let fid = seed_faction(&db, "g1");
        let pid = db
            .create_poll(fid, "u1", "Raid tonight?", r#"["Yes","No","Later"]"#, "2026-09-01 18:00:00")
            .unwrap();

        // Empty poll tallies are zero-filled
        assert_eq!(db.poll_tallies(pid, 3).unwrap(), vec![0, 0, 0]);

        db.record_poll_vote(pid, "u2", 0).unwrap();
        db.record_poll_vote(pid, "u2", 1).unwrap();
        db.record_poll_vote(pid, "u3", 1).unwrap();

        // u2's earlier choice was overwritten
        assert_eq!(db.poll_tallies(pid, 3).unwrap(), vec![0, 2, 0]);

        assert_eq!(db.close_poll(pid, fid, "No", 2).unwrap(), 1);
        // Second closure is a no-op
        assert_eq!(db.close_poll(pid, fid, "No", 2).unwrap(), 0);

        let poll = db.get_poll(pid, fid).unwrap().unwrap();
        assert!(poll.closed);
        assert_eq!(poll.winner.as_deref(), Some("No"));
        assert_eq!(poll.total_votes, Some(2));
    }

    #[test]
    fn test_radio_upsert() {
        let db = test_db();
        let fid = seed_faction(&db, "g1");

        assert!(db.get_radio(fid).unwrap().is_none());

        db.upsert_radio(fid, "123.45", "FM", "u1").unwrap();
        db.upsert_radio(fid, "456.78", "Digital", "u2").unwrap();

        let radio = db.get_radio(fid).unwrap().unwrap();
        assert_eq!(radio.frequency, "456.78");
        assert_eq!(radio.format, "Digital");
        assert_eq!(radio.updated_by, "u2");
    }
}
