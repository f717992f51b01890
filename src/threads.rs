//! Executor thread dumps.

use std::fmt;

use serde::Serialize;

use crate::coerce::WireEnum;
use crate::error::{Anomaly, FieldPath};
use crate::schema::{Entity, FieldSpec, Reader};

/// JVM thread state
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadState {
    New,
    Runnable,
    Blocked,
    Waiting,
    TimedWaiting,
    Terminated,
}

impl WireEnum for ThreadState {
    const ENUM_NAME: &'static str = "ThreadState";
    const MEMBERS: &'static [Self] = &[
        Self::New,
        Self::Runnable,
        Self::Blocked,
        Self::Waiting,
        Self::TimedWaiting,
        Self::Terminated,
    ];

    fn value(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Runnable => "RUNNABLE",
            Self::Blocked => "BLOCKED",
            Self::Waiting => "WAITING",
            Self::TimedWaiting => "TIMED_WAITING",
            Self::Terminated => "TERMINATED",
        }
    }
}

/// Stack frames, innermost first, each already rendered as a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackTrace {
    pub elems: Vec<String>,
}

impl StackTrace {
    /// Frames joined with `<br />`, trailing whitespace trimmed.
    pub fn html(&self) -> String {
        self.elems
            .iter()
            .map(|e| e.trim_end())
            .collect::<Vec<_>>()
            .join("<br />")
    }

    pub fn mkstring(&self, start: &str, sep: &str, end: &str) -> String {
        format!("{}{}{}", start, self.elems.join(sep), end)
    }
}

/// Frames concatenated as-is; each frame carries its own line break.
impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for elem in &self.elems {
            f.write_str(elem)?;
        }
        Ok(())
    }
}

impl Entity for StackTrace {
    const NAME: &'static str = "StackTrace";
    const LABEL: &'static str = "stack_trace";
    const FIELDS: &'static [FieldSpec] = &[FieldSpec::required("elems", "elems")];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let elems = r.required("elems");
        Some(Self { elems: elems? })
    }
}

/// A captured thread. `blocked_by_thread_id` names another thread of the
/// same dump; callers resolve it by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStackTrace {
    pub thread_id: Option<i64>,
    pub thread_name: Option<String>,
    pub thread_state: Option<ThreadState>,
    pub stack_trace: Option<StackTrace>,
    pub blocked_by_thread_id: Option<i64>,
    pub blocked_by_lock: Option<String>,
    /// Superseded by `synchronizers` and `monitors`.
    pub holding_locks: Vec<String>,
    pub synchronizers: Vec<String>,
    pub monitors: Vec<String>,
    pub lock_name: Option<String>,
    pub lock_owner_name: Option<String>,
    pub suspended: bool,
    pub in_native: Option<bool>,
    pub is_daemon: Option<bool>,
    pub priority: i64,
}

impl ThreadStackTrace {
    pub fn is_blocked(&self) -> bool {
        self.blocked_by_thread_id.is_some() || self.thread_state == Some(ThreadState::Blocked)
    }

    /// Look up the blocking thread in `dump`.
    pub fn blocker<'a>(&self, dump: &'a [ThreadStackTrace]) -> Option<&'a ThreadStackTrace> {
        let id = self.blocked_by_thread_id?;
        dump.iter().find(|t| t.thread_id == Some(id))
    }
}

impl Entity for ThreadStackTrace {
    const NAME: &'static str = "ThreadStackTrace";
    const LABEL: &'static str = "thread";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("thread_id", "threadId"),
        FieldSpec::optional("thread_name", "threadName"),
        FieldSpec::optional("thread_state", "threadState"),
        FieldSpec::optional("stack_trace", "stackTrace"),
        FieldSpec::optional("blocked_by_thread_id", "blockedByThreadId"),
        FieldSpec::optional("blocked_by_lock", "blockedByLock"),
        FieldSpec::optional("holding_locks", "holdingLocks"),
        FieldSpec::required("synchronizers", "synchronizers"),
        FieldSpec::required("monitors", "monitors"),
        FieldSpec::optional("lock_name", "lockName"),
        FieldSpec::optional("lock_owner_name", "lockOwnerName"),
        FieldSpec::required("suspended", "suspended"),
        FieldSpec::optional("in_native", "inNative"),
        FieldSpec::optional("is_daemon", "isDaemon"),
        FieldSpec::required("priority", "priority"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let synchronizers = r.required("synchronizers");
        let monitors = r.required("monitors");
        let suspended = r.required("suspended");
        let priority = r.required("priority");
        Some(Self {
            thread_id: r.optional("thread_id"),
            thread_name: r.optional("thread_name"),
            thread_state: r.optional_enum("thread_state"),
            stack_trace: r.optional("stack_trace"),
            blocked_by_thread_id: r.optional("blocked_by_thread_id"),
            blocked_by_lock: r.optional("blocked_by_lock"),
            holding_locks: r.defaulted("holding_locks"),
            lock_name: r.optional("lock_name"),
            lock_owner_name: r.optional("lock_owner_name"),
            in_native: r.optional("in_native"),
            is_daemon: r.optional("is_daemon"),
            synchronizers: synchronizers?,
            monitors: monitors?,
            suspended: suspended?,
            priority: priority?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        if let (Some(id), Some(blocker)) = (self.thread_id, self.blocked_by_thread_id) {
            if id == blocker {
                warnings.push(Anomaly::Inconsistent {
                    path: path.field("blocked_by_thread_id"),
                    detail: format!("thread {} is blocked by itself", id),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::normalize_list;
    use serde_json::json;

    #[test]
    fn test_stack_trace_rendering() {
        let trace = StackTrace {
            elems: vec!["at a.B.c(B.java:1)  \n".to_string(), "at a.B.d(B.java:2)\n".to_string()],
        };
        assert_eq!(trace.to_string(), "at a.B.c(B.java:1)  \nat a.B.d(B.java:2)\n");
        assert_eq!(trace.html(), "at a.B.c(B.java:1)<br />at a.B.d(B.java:2)");
        assert_eq!(trace.mkstring("[", "|", "]").matches('|').count(), 1);
    }

    #[test]
    fn test_thread_dump_blocked_by_is_a_reference() {
        let payload = json!([
            {
                "threadId": 41, "threadName": "Executor task launch worker-0",
                "threadState": "blocked", "stackTrace": {"elems": ["at x\n"]},
                "blockedByThreadId": 42, "blockedByLock": "java.lang.Object@1a2b",
                "synchronizers": [], "monitors": [], "suspended": false, "priority": 5
            },
            {
                "threadId": 42, "threadName": "dispatcher", "threadState": "TIMED_WAITING",
                "holdingLocks": ["java.lang.Object@1a2b"],
                "synchronizers": [], "monitors": ["java.lang.Object@1a2b"],
                "suspended": false, "priority": 5, "isDaemon": true
            }
        ]);
        let dump = normalize_list::<ThreadStackTrace>(&payload).unwrap().value;
        assert!(dump[0].is_blocked());
        assert_eq!(dump[0].thread_state, Some(ThreadState::Blocked));
        let blocker = dump[0].blocker(&dump).unwrap();
        assert_eq!(blocker.thread_name.as_deref(), Some("dispatcher"));
        assert_eq!(blocker.thread_state, Some(ThreadState::TimedWaiting));
        assert!(blocker.blocker(&dump).is_none());
        assert!(dump[0].holding_locks.is_empty());
    }

    #[test]
    fn test_self_block_is_a_warning() {
        let payload = json!([{
            "threadId": 7, "blockedByThreadId": 7,
            "synchronizers": [], "monitors": [], "suspended": false, "priority": 1
        }]);
        let normalized = normalize_list::<ThreadStackTrace>(&payload).unwrap();
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(
            normalized.warnings[0].path().to_string(),
            "thread[0].blocked_by_thread_id"
        );
    }
}
