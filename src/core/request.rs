use serde::{Deserialize, Serialize};

/// Lifecycle of a work request. Stored uppercase in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Draft,
    Planned,
    Approved,
    Rejected,
    Executing,
    Done,
    Failed,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Draft => "DRAFT",
            RequestStatus::Planned => "PLANNED",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Executing => "EXECUTING",
            RequestStatus::Done => "DONE",
            RequestStatus::Failed => "FAILED",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(RequestStatus::Draft),
            "PLANNED" => Some(RequestStatus::Planned),
            "APPROVED" => Some(RequestStatus::Approved),
            "REJECTED" => Some(RequestStatus::Rejected),
            "EXECUTING" => Some(RequestStatus::Executing),
            "DONE" => Some(RequestStatus::Done),
            "FAILED" => Some(RequestStatus::Failed),
            _ => None,
        }
    }

    /// REJECTED, DONE and FAILED are terminal. There is deliberately no
    /// retry edge out of FAILED.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Done | RequestStatus::Failed
        )
    }
}

pub fn can_transition(from: RequestStatus, to: RequestStatus) -> bool {
    match from {
        RequestStatus::Draft => matches!(to, RequestStatus::Planned),
        RequestStatus::Planned => {
            matches!(to, RequestStatus::Approved | RequestStatus::Rejected)
        }
        RequestStatus::Approved => matches!(to, RequestStatus::Executing),
        RequestStatus::Executing => matches!(to, RequestStatus::Done | RequestStatus::Failed),
        RequestStatus::Rejected | RequestStatus::Done | RequestStatus::Failed => false,
    }
}

/// Full row of the work_request table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRequestRecord {
    pub id: i64,
    pub requester: String,
    pub title: String,
    pub input_text: String,
    pub status: String,
    pub plan_json: Option<String>,
    pub result_json: Option<String>,
    pub approved_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub approved_at: Option<String>,
    pub executed_at: Option<String>,
}

/// Listing view: newest request first, no plan/result payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRequestSummary {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub requester: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub request_id: i64,
    pub actor: String,
    pub action: String,
    pub message: String,
    pub success: bool,
    pub latency_ms: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: i64,
    pub request_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiPageRecord {
    pub id: i64,
    pub request_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: String,
}

/// Audit action tags. One entry per meaningful action against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Plan,
    Approve,
    Reject,
    Tool,
    Execute,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Plan => "PLAN",
            AuditAction::Approve => "APPROVE",
            AuditAction::Reject => "REJECT",
            AuditAction::Tool => "TOOL",
            AuditAction::Execute => "EXECUTE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        let path = [
            (RequestStatus::Draft, RequestStatus::Planned),
            (RequestStatus::Planned, RequestStatus::Approved),
            (RequestStatus::Approved, RequestStatus::Executing),
            (RequestStatus::Executing, RequestStatus::Done),
        ];
        for (from, to) in path {
            assert!(
                can_transition(from, to),
                "expected transition {:?} -> {:?} to be allowed",
                from,
                to
            );
        }
    }

    #[test]
    fn rejection_and_failure_edges_are_allowed() {
        assert!(can_transition(RequestStatus::Planned, RequestStatus::Rejected));
        assert!(can_transition(RequestStatus::Executing, RequestStatus::Failed));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        let all = [
            RequestStatus::Draft,
            RequestStatus::Planned,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Executing,
            RequestStatus::Done,
            RequestStatus::Failed,
        ];
        for from in [RequestStatus::Rejected, RequestStatus::Done, RequestStatus::Failed] {
            assert!(from.is_terminal());
            for to in all {
                assert!(
                    !can_transition(from, to),
                    "unexpected edge {:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn approval_requires_a_planned_request() {
        assert!(!can_transition(RequestStatus::Draft, RequestStatus::Approved));
        assert!(!can_transition(RequestStatus::Executing, RequestStatus::Approved));
        assert!(!can_transition(RequestStatus::Draft, RequestStatus::Rejected));
    }

    #[test]
    fn execution_requires_approval_and_cannot_rerun() {
        assert!(!can_transition(RequestStatus::Planned, RequestStatus::Executing));
        assert!(!can_transition(RequestStatus::Done, RequestStatus::Executing));
        assert!(!can_transition(RequestStatus::Failed, RequestStatus::Executing));
        assert!(!can_transition(RequestStatus::Executing, RequestStatus::Executing));
    }

    #[test]
    fn status_strings_round_trip() {
        for s in [
            RequestStatus::Draft,
            RequestStatus::Planned,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Executing,
            RequestStatus::Done,
            RequestStatus::Failed,
        ] {
            assert_eq!(RequestStatus::from_status(s.as_str()), Some(s));
        }
        assert_eq!(RequestStatus::from_status("COMPLETED"), None);
    }
}
