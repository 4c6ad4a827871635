use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::core::error::{OpsError, OpsResult};
use crate::core::request::{
    AuditAction, AuditRecord, RequestStatus, TicketRecord, WikiPageRecord, WorkRequestRecord,
    WorkRequestSummary,
};

const REQUEST_COLUMNS: &str = "id, requester, title, input_text, status, plan_json, result_json, \
     approved_by, created_at, updated_at, approved_at, executed_at";

/// Durable state of the service: requests, audit log, tickets, wiki pages.
///
/// Every lifecycle transition is a single conditional UPDATE guarded by the
/// expected current status. Zero affected rows means the guard failed and the
/// caller gets `InvalidState` with the status actually observed, so a second
/// concurrent execute can never slip past the APPROVED check.
#[derive(Clone)]
pub struct WorkStore {
    db: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsStats {
    #[serde(rename = "totalRequests")]
    pub total_requests: i64,
    pub done: i64,
    pub failed: i64,
    #[serde(rename = "avgAuditLatencyMs")]
    pub avg_audit_latency_ms: i64,
}

impl WorkStore {
    pub fn open<P: AsRef<Path>>(path: P) -> OpsResult<Self> {
        let db = Connection::open(path.as_ref())?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS work_request (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                requester TEXT NOT NULL,
                title TEXT NOT NULL,
                input_text TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'DRAFT',
                plan_json TEXT,
                result_json TEXT,
                approved_by TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                approved_at DATETIME,
                executed_at DATETIME
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER NOT NULL,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                message TEXT NOT NULL,
                success INTEGER NOT NULL,
                latency_ms INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS ticket (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS wiki_page (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_audit_log_request_id_id ON audit_log(request_id, id)",
            [],
        )?;
        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_ticket_request_id ON ticket(request_id)",
            [],
        )?;

        info!("Work store ready at {}", path.as_ref().display());

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub async fn create(&self, requester: &str, title: &str, input_text: &str) -> OpsResult<i64> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO work_request (requester, title, input_text, status) VALUES (?1, ?2, ?3, 'DRAFT')",
            params![requester, title, input_text],
        )?;
        Ok(db.last_insert_rowid())
    }

    pub async fn list(&self) -> OpsResult<Vec<WorkRequestSummary>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, title, status, requester, created_at, updated_at
             FROM work_request ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WorkRequestSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                status: row.get(2)?,
                requester: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn find(&self, id: i64) -> OpsResult<WorkRequestRecord> {
        let db = self.db.lock().await;
        Self::find_locked(&db, id)
    }

    fn find_locked(db: &Connection, id: i64) -> OpsResult<WorkRequestRecord> {
        let mut stmt = db.prepare(&format!(
            "SELECT {REQUEST_COLUMNS} FROM work_request WHERE id = ?1 LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(WorkRequestRecord {
                id: row.get(0)?,
                requester: row.get(1)?,
                title: row.get(2)?,
                input_text: row.get(3)?,
                status: row.get(4)?,
                plan_json: row.get(5)?,
                result_json: row.get(6)?,
                approved_by: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
                approved_at: row.get(10)?,
                executed_at: row.get(11)?,
            })
        } else {
            Err(OpsError::NotFound)
        }
    }

    /// Why the conditional UPDATE changed no rows: request gone, or its
    /// status no longer satisfies the guard.
    fn guard_failure(db: &Connection, id: i64) -> OpsError {
        match Self::find_locked(db, id) {
            Ok(rec) => OpsError::InvalidState { status: rec.status },
            Err(e) => e,
        }
    }

    /// DRAFT -> PLANNED, storing the validated plan document.
    pub async fn save_plan(&self, id: i64, plan_json: &str) -> OpsResult<()> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE work_request
             SET plan_json = ?1, status = 'PLANNED', updated_at = CURRENT_TIMESTAMP
             WHERE id = ?2 AND status = 'DRAFT'",
            params![plan_json, id],
        )?;
        if rows == 0 {
            return Err(Self::guard_failure(&db, id));
        }
        Ok(())
    }

    /// PLANNED -> APPROVED or REJECTED, recording who decided.
    pub async fn approve(&self, id: i64, approver: &str, ok: bool) -> OpsResult<RequestStatus> {
        let to = if ok {
            RequestStatus::Approved
        } else {
            RequestStatus::Rejected
        };
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE work_request
             SET status = ?1, approved_by = ?2, approved_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3 AND status = 'PLANNED'",
            params![to.as_str(), approver, id],
        )?;
        if rows == 0 {
            return Err(Self::guard_failure(&db, id));
        }
        Ok(to)
    }

    /// APPROVED -> EXECUTING. Single atomic write; this is the
    /// double-execution guard, persisted before any tool runs.
    pub async fn mark_executing(&self, id: i64) -> OpsResult<()> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE work_request
             SET status = 'EXECUTING', updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status = 'APPROVED'",
            params![id],
        )?;
        if rows == 0 {
            return Err(Self::guard_failure(&db, id));
        }
        Ok(())
    }

    /// EXECUTING -> DONE or FAILED, storing the result document.
    pub async fn finish(&self, id: i64, ok: bool, result_json: &str) -> OpsResult<()> {
        let to = if ok {
            RequestStatus::Done
        } else {
            RequestStatus::Failed
        };
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE work_request
             SET status = ?1, result_json = ?2, executed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3 AND status = 'EXECUTING'",
            params![to.as_str(), result_json, id],
        )?;
        if rows == 0 {
            return Err(Self::guard_failure(&db, id));
        }
        Ok(())
    }

    /// Append-only. Rows are never updated or deleted; insertion order is the
    /// causal order of the request's history.
    pub async fn audit(
        &self,
        request_id: i64,
        actor: &str,
        action: AuditAction,
        message: &str,
        success: bool,
        latency_ms: u64,
    ) -> OpsResult<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO audit_log (request_id, actor, action, message, success, latency_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request_id,
                actor,
                action.as_str(),
                message,
                success,
                latency_ms as i64
            ],
        )?;
        Ok(())
    }

    pub async fn audit_list(&self, request_id: i64) -> OpsResult<Vec<AuditRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, request_id, actor, action, message, success, latency_ms, created_at
             FROM audit_log WHERE request_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![request_id], |row| {
            Ok(AuditRecord {
                id: row.get(0)?,
                request_id: row.get(1)?,
                actor: row.get(2)?,
                action: row.get(3)?,
                message: row.get(4)?,
                success: row.get(5)?,
                latency_ms: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn insert_ticket(
        &self,
        request_id: i64,
        title: &str,
        description: &str,
    ) -> OpsResult<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO ticket (request_id, title, description) VALUES (?1, ?2, ?3)",
            params![request_id, title, description],
        )?;
        Ok(())
    }

    pub async fn insert_wiki(&self, request_id: i64, title: &str, body: &str) -> OpsResult<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO wiki_page (request_id, title, body) VALUES (?1, ?2, ?3)",
            params![request_id, title, body],
        )?;
        Ok(())
    }

    pub async fn tickets(&self, request_id: i64) -> OpsResult<Vec<TicketRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, request_id, title, description, created_at
             FROM ticket WHERE request_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![request_id], |row| {
            Ok(TicketRecord {
                id: row.get(0)?,
                request_id: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn wiki_pages(&self, request_id: i64) -> OpsResult<Vec<WikiPageRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, request_id, title, body, created_at
             FROM wiki_page WHERE request_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![request_id], |row| {
            Ok(WikiPageRecord {
                id: row.get(0)?,
                request_id: row.get(1)?,
                title: row.get(2)?,
                body: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn stats(&self) -> OpsResult<OpsStats> {
        let db = self.db.lock().await;
        let total_requests: i64 =
            db.query_row("SELECT COUNT(*) FROM work_request", [], |row| row.get(0))?;
        let done: i64 = db.query_row(
            "SELECT COUNT(*) FROM work_request WHERE status = 'DONE'",
            [],
            |row| row.get(0),
        )?;
        let failed: i64 = db.query_row(
            "SELECT COUNT(*) FROM work_request WHERE status = 'FAILED'",
            [],
            |row| row.get(0),
        )?;
        let avg_latency: f64 = db.query_row(
            "SELECT COALESCE(AVG(latency_ms), 0) FROM audit_log",
            [],
            |row| row.get(0),
        )?;
        Ok(OpsStats {
            total_requests,
            done,
            failed,
            avg_audit_latency_ms: avg_latency.round() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch_store() -> (tempfile::TempDir, WorkStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = WorkStore::open(dir.path().join("ops.db")).expect("open store");
        (dir, store)
    }

    #[tokio::test]
    async fn create_starts_in_draft_and_listing_is_newest_first() {
        let (_dir, store) = scratch_store().await;
        let a = store.create("alice", "First", "do a thing").await.unwrap();
        let b = store.create("bob", "Second", "do more").await.unwrap();

        let rec = store.find(a).await.unwrap();
        assert_eq!(rec.status, "DRAFT");
        assert!(rec.plan_json.is_none());

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b);
        assert_eq!(listed[1].id, a);
    }

    #[tokio::test]
    async fn find_unknown_id_is_not_found() {
        let (_dir, store) = scratch_store().await;
        assert!(matches!(store.find(99).await, Err(OpsError::NotFound)));
    }

    #[tokio::test]
    async fn approve_is_rejected_outside_planned() {
        let (_dir, store) = scratch_store().await;
        let id = store.create("alice", "T", "x").await.unwrap();

        let err = store.approve(id, "bob", true).await.unwrap_err();
        match err {
            OpsError::InvalidState { status } => assert_eq!(status, "DRAFT"),
            other => panic!("expected InvalidState, got {other:?}"),
        }
        assert_eq!(store.find(id).await.unwrap().status, "DRAFT");
    }

    #[tokio::test]
    async fn mark_executing_is_a_one_shot_guard() {
        let (_dir, store) = scratch_store().await;
        let id = store.create("alice", "T", "x").await.unwrap();
        store.save_plan(id, "{\"steps\":[]}").await.unwrap();
        store.approve(id, "bob", true).await.unwrap();

        store.mark_executing(id).await.unwrap();
        let err = store.mark_executing(id).await.unwrap_err();
        match err {
            OpsError::InvalidState { status } => assert_eq!(status, "EXECUTING"),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn finish_records_result_and_timestamps() {
        let (_dir, store) = scratch_store().await;
        let id = store.create("alice", "T", "x").await.unwrap();
        store.save_plan(id, "{}").await.unwrap();
        store.approve(id, "bob", true).await.unwrap();
        store.mark_executing(id).await.unwrap();
        store.finish(id, true, "{\"toolResults\":[]}").await.unwrap();

        let rec = store.find(id).await.unwrap();
        assert_eq!(rec.status, "DONE");
        assert_eq!(rec.result_json.as_deref(), Some("{\"toolResults\":[]}"));
        assert!(rec.executed_at.is_some());

        // Terminal: a second finish must not go through.
        assert!(store.finish(id, false, "{}").await.is_err());
    }

    #[tokio::test]
    async fn audit_entries_keep_insertion_order() {
        let (_dir, store) = scratch_store().await;
        let id = store.create("alice", "T", "x").await.unwrap();
        store
            .audit(id, "alice", AuditAction::Create, "created", true, 3)
            .await
            .unwrap();
        store
            .audit(id, "alice", AuditAction::Plan, "plan created", true, 120)
            .await
            .unwrap();
        store
            .audit(id, "bob", AuditAction::Approve, "", true, 1)
            .await
            .unwrap();

        let entries = store.audit_list(id).await.unwrap();
        let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["CREATE", "PLAN", "APPROVE"]);
        assert!(entries.iter().all(|e| e.latency_ms >= 0));
    }

    #[tokio::test]
    async fn stats_aggregate_counts_and_latency() {
        let (_dir, store) = scratch_store().await;
        let id = store.create("alice", "T", "x").await.unwrap();
        store.save_plan(id, "{}").await.unwrap();
        store.approve(id, "bob", true).await.unwrap();
        store.mark_executing(id).await.unwrap();
        store.finish(id, false, "{\"error\":\"boom\"}").await.unwrap();
        store
            .audit(id, "alice", AuditAction::Execute, "failed", false, 10)
            .await
            .unwrap();
        store
            .audit(id, "alice", AuditAction::Tool, "ok", true, 20)
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.done, 0);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.avg_audit_latency_ms, 15);
    }
}
