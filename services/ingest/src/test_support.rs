//! In-memory stores and remote API fixtures shared by the unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use lark_common::error::{LarkError, LarkResult};
use lark_db::approvals::models::{
    ApprovalDefinition, ConflictPolicy, InstanceDetailUpdate, NewApprovalInstance,
    PendingInstance,
};
use lark_db::approvals::repositories::ApprovalRepository;
use lark_db::users::models::{LarkUser, UserProfile};
use lark_db::users::repositories::LarkUserRepository;

pub const LIST_PATH: &str = "/approval/v4/instance/list";
pub const TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";

// ── Remote fixtures ─────────────────────────────────────────────

/// `n` valid listing items with codes `{prefix}-{i}`.
pub fn instance_items(prefix: &str, n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            json!({
                "instance_code": format!("{prefix}-{i}"),
                "status": "PENDING",
                "start_time": (1_735_689_600_000_i64 + i as i64 * 60_000).to_string(),
            })
        })
        .collect()
}

pub fn list_page(items: Vec<Value>, has_more: bool, page_token: Option<&str>) -> Value {
    let mut data = json!({ "instance_list": items, "has_more": has_more });
    if let Some(token) = page_token {
        data["page_token"] = json!(token);
    }
    json!({ "code": 0, "msg": "success", "data": data })
}

/// Matches list requests by the `page_token` in the body; `None` matches
/// requests that carry no token (the first page).
struct PageTokenIs(Option<String>);

impl Match for PageTokenIs {
    fn matches(&self, request: &Request) -> bool {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return false,
        };
        let sent = body.get("page_token").and_then(Value::as_str);
        sent == self.0.as_deref()
    }
}

pub async fn mount_page(server: &MockServer, page_token: Option<&str>, body: Value) {
    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(PageTokenIs(page_token.map(str::to_string)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "ok",
            "tenant_access_token": "t-test",
            "expire": 7200
        })))
        .mount(server)
        .await;
}

/// Token endpoint answering 200 without a token.
pub async fn mount_missing_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "msg": "ok" })),
        )
        .mount(server)
        .await;
}

pub fn instance_row(code: &str, approval_code: &str, apply_time: DateTime<Utc>) -> NewApprovalInstance {
    NewApprovalInstance {
        instance_code: code.to_string(),
        approval_code: approval_code.to_string(),
        status: Some("PENDING".to_string()),
        apply_time,
    }
}

// ── Approval store ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StoredInstance {
    pub row: NewApprovalInstance,
    pub detail: Option<InstanceDetailUpdate>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryApprovalRepo {
    definitions: Mutex<Vec<ApprovalDefinition>>,
    instances: Mutex<BTreeMap<String, StoredInstance>>,
    upsert_batches: Mutex<Vec<usize>>,
    fail_latest: Mutex<HashSet<String>>,
    fail_upsert: Mutex<HashSet<String>>,
    fail_detail: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
}

impl MemoryApprovalRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definitions(codes: &[&str]) -> Self {
        let repo = Self::new();
        *repo.definitions.lock().unwrap() = codes
            .iter()
            .map(|code| ApprovalDefinition {
                approval_code: code.to_string(),
                name: None,
                enabled: true,
            })
            .collect();
        repo
    }

    pub fn fail_latest_for(&self, approval_code: &str) {
        self.fail_latest.lock().unwrap().insert(approval_code.to_string());
    }

    /// Any upsert batch containing `instance_code` fails.
    pub fn fail_upsert_containing(&self, instance_code: &str) {
        self.fail_upsert.lock().unwrap().insert(instance_code.to_string());
    }

    pub fn fail_detail_for(&self, instance_code: &str) {
        self.fail_detail.lock().unwrap().insert(instance_code.to_string());
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn upsert_batch_sizes(&self) -> Vec<usize> {
        self.upsert_batches.lock().unwrap().clone()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    pub fn instance_count_for(&self, approval_code: &str) -> usize {
        self.instances
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.row.approval_code == approval_code)
            .count()
    }

    pub fn instance(&self, instance_code: &str) -> Option<StoredInstance> {
        self.instances.lock().unwrap().get(instance_code).cloned()
    }

    /// Store `row` as if its detail was last refreshed at `last_updated`.
    pub fn seed(&self, row: NewApprovalInstance, last_updated: Option<DateTime<Utc>>) {
        self.instances.lock().unwrap().insert(
            row.instance_code.clone(),
            StoredInstance {
                row,
                detail: None,
                last_updated,
                last_checked: last_updated,
            },
        );
    }
}

fn advance(current: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Some(current.map_or(now, |t| t.max(now)))
}

#[async_trait]
impl ApprovalRepository for MemoryApprovalRepo {
    async fn list_enabled_approvals(&self) -> LarkResult<Vec<ApprovalDefinition>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(LarkError::Database("connection refused".to_string()));
        }
        Ok(self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.enabled)
            .cloned()
            .collect())
    }

    async fn latest_apply_time(&self, approval_code: &str) -> LarkResult<Option<DateTime<Utc>>> {
        if self.fail_latest.lock().unwrap().contains(approval_code) {
            return Err(LarkError::Database("statement timeout".to_string()));
        }
        Ok(self
            .instances
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.row.approval_code == approval_code)
            .map(|s| s.row.apply_time)
            .max())
    }

    async fn upsert_instances(
        &self,
        rows: &[NewApprovalInstance],
        policy: ConflictPolicy,
        now: DateTime<Utc>,
    ) -> LarkResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.upsert_batches.lock().unwrap().push(rows.len());
        {
            let poisoned = self.fail_upsert.lock().unwrap();
            if rows.iter().any(|r| poisoned.contains(&r.instance_code)) {
                return Err(LarkError::Database("value too long".to_string()));
            }
        }

        let mut instances = self.instances.lock().unwrap();
        let mut affected = 0;
        for row in rows {
            match instances.get_mut(&row.instance_code) {
                Some(stored) => {
                    if policy == ConflictPolicy::UpdateInPlace {
                        stored.row = row.clone();
                        stored.last_updated = advance(stored.last_updated, now);
                        affected += 1;
                    }
                }
                None => {
                    instances.insert(
                        row.instance_code.clone(),
                        StoredInstance {
                            row: row.clone(),
                            detail: None,
                            last_updated: None,
                            last_checked: None,
                        },
                    );
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn list_pending_instances(&self, limit: i64) -> LarkResult<Vec<PendingInstance>> {
        let instances = self.instances.lock().unwrap();
        let mut pending: Vec<&StoredInstance> = instances
            .values()
            .filter(|s| s.row.status.as_deref().map_or(true, |st| st == "PENDING"))
            .collect();
        // None sorts before Some, matching `nulls first`
        pending.sort_by_key(|s| (s.last_checked, s.row.apply_time));
        Ok(pending
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|s| PendingInstance {
                instance_code: s.row.instance_code.clone(),
                approval_code: s.row.approval_code.clone(),
                status: s.row.status.clone(),
                last_updated: s.last_updated,
                last_checked: s.last_checked,
            })
            .collect())
    }

    async fn update_instance_detail(
        &self,
        detail: &InstanceDetailUpdate,
        now: DateTime<Utc>,
    ) -> LarkResult<bool> {
        if self.fail_detail.lock().unwrap().contains(&detail.instance_code) {
            return Err(LarkError::Database("deadlock detected".to_string()));
        }
        let mut instances = self.instances.lock().unwrap();
        let Some(stored) = instances.get_mut(&detail.instance_code) else {
            return Ok(false);
        };
        stored.row.status = Some(detail.status.clone());
        stored.detail = Some(detail.clone());
        stored.last_updated = advance(stored.last_updated, now);
        stored.last_checked = advance(stored.last_checked, now);
        Ok(true)
    }

    async fn mark_instance_checked(&self, instance_code: &str, now: DateTime<Utc>) -> LarkResult<()> {
        if let Some(stored) = self.instances.lock().unwrap().get_mut(instance_code) {
            stored.last_checked = advance(stored.last_checked, now);
        }
        Ok(())
    }

    async fn update_instance_status(
        &self,
        instance_code: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> LarkResult<bool> {
        let mut instances = self.instances.lock().unwrap();
        let Some(stored) = instances.get_mut(instance_code) else {
            return Ok(false);
        };
        stored.row.status = Some(status.to_string());
        stored.last_updated = advance(stored.last_updated, now);
        Ok(true)
    }
}

// ── User store ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<BTreeMap<String, LarkUser>>,
    profile_writes: AtomicUsize,
    fail_update: Mutex<HashSet<String>>,
}

impl MemoryUserRepo {
    pub fn with_users(users: Vec<(&str, UserProfile)>) -> Self {
        let repo = Self::default();
        {
            let mut stored = repo.users.lock().unwrap();
            for (user_id, profile) in users {
                stored.insert(
                    user_id.to_string(),
                    LarkUser {
                        user_id: user_id.to_string(),
                        profile,
                        last_updated: None,
                        last_checked: None,
                    },
                );
            }
        }
        repo
    }

    pub fn fail_update_for(&self, user_id: &str) {
        self.fail_update.lock().unwrap().insert(user_id.to_string());
    }

    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }

    pub fn user(&self, user_id: &str) -> Option<LarkUser> {
        self.users.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl LarkUserRepository for MemoryUserRepo {
    async fn list_users_for_refresh(&self, limit: i64) -> LarkResult<Vec<LarkUser>> {
        let users = self.users.lock().unwrap();
        let mut queue: Vec<LarkUser> = users.values().cloned().collect();
        queue.sort_by_key(|u| u.last_checked);
        queue.truncate(limit.max(0) as usize);
        Ok(queue)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> LarkResult<bool> {
        if self.fail_update.lock().unwrap().contains(user_id) {
            return Err(LarkError::Database("connection reset".to_string()));
        }
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(user_id) else {
            return Ok(false);
        };
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        user.profile = profile.clone();
        user.last_updated = advance(user.last_updated, now);
        user.last_checked = advance(user.last_checked, now);
        Ok(true)
    }

    async fn mark_checked(&self, user_id: &str, now: DateTime<Utc>) -> LarkResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(user_id) {
            user.last_checked = advance(user.last_checked, now);
        }
        Ok(())
    }
}
