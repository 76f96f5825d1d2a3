// Lyceum
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Audit trail of authorization decisions and role mutations

use crate::roles::RoleId;
use crate::scope::{ActorId, Scope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AuditEventType {
    RoleCreated,
    RoleUpdated,
    RoleDeleted,
    RoleAssigned,
    RoleUnassigned,
    /// Every assignment of an actor was dropped
    ActorRemoved,
    AccessGranted,
    AccessDenied,
    /// A mutation was refused by a business rule or permission check
    MutationRejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditResult {
    Success,
    Failure,
    Denied,
}

/// Audit event entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: String,

    pub event_type: AuditEventType,

    pub timestamp: DateTime<Utc>,

    /// Actor who performed the action
    pub actor: ActorId,

    /// Scope the action happened in
    pub scope: Scope,

    /// Actor affected by the action, if any
    pub target_actor: Option<ActorId>,

    pub role_id: Option<RoleId>,

    pub result: AuditResult,

    /// Additional event details
    pub details: BTreeMap<String, String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, actor: &ActorId, scope: &Scope, result: AuditResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            actor: actor.clone(),
            scope: scope.clone(),
            target_actor: None,
            role_id: None,
            result,
            details: BTreeMap::new(),
        }
    }

    pub fn with_target_actor(mut self, target: &ActorId) -> Self {
        self.target_actor = Some(target.clone());
        self
    }

    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.role_id = Some(role_id);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Bounded in-memory audit log; the oldest events are dropped first
#[derive(Debug)]
pub struct AuditLogger {
    events: RwLock<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_max_events(10_000)
    }

    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
        }
    }

    pub async fn log_event(&self, event: AuditEvent) {
        match event.result {
            AuditResult::Success => {
                info!(
                    event_type = ?event.event_type,
                    actor = %event.actor,
                    scope = %event.scope,
                    target_actor = ?event.target_actor,
                    role_id = ?event.role_id,
                    "Audit event: {:?}", event.event_type
                );
            }
            AuditResult::Failure | AuditResult::Denied => {
                warn!(
                    event_type = ?event.event_type,
                    actor = %event.actor,
                    scope = %event.scope,
                    target_actor = ?event.target_actor,
                    role_id = ?event.role_id,
                    result = ?event.result,
                    details = ?event.details,
                    "Audit event: {:?} - {:?}", event.event_type, event.result
                );
            }
        }

        self.record(event).await;
    }

    /// Store an event without tracing it; for callers that already logged the outcome
    pub async fn record(&self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }

        let mut events = self.events.write().await;
        while events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Record the outcome of a permission check. The decision itself is traced by the caller.
    pub async fn log_access(&self, actor: &ActorId, scope: &Scope, requirement: &str, granted: bool) {
        let (event_type, result) = if granted {
            (AuditEventType::AccessGranted, AuditResult::Success)
        } else {
            (AuditEventType::AccessDenied, AuditResult::Denied)
        };

        self.record(AuditEvent::new(event_type, actor, scope, result).with_detail("requirement", requirement)).await;
    }

    pub async fn log_role_created(&self, actor: &ActorId, scope: &Scope, role_id: RoleId, key: &str) {
        let event = AuditEvent::new(AuditEventType::RoleCreated, actor, scope, AuditResult::Success).with_role(role_id).with_detail("key", key);
        self.log_event(event).await;
    }

    pub async fn log_role_updated(&self, actor: &ActorId, scope: &Scope, role_id: RoleId, version: u64) {
        let event = AuditEvent::new(AuditEventType::RoleUpdated, actor, scope, AuditResult::Success)
            .with_role(role_id)
            .with_detail("version", version.to_string());
        self.log_event(event).await;
    }

    pub async fn log_role_deleted(&self, actor: &ActorId, scope: &Scope, role_id: RoleId) {
        let event = AuditEvent::new(AuditEventType::RoleDeleted, actor, scope, AuditResult::Success).with_role(role_id);
        self.log_event(event).await;
    }

    pub async fn log_role_assigned(&self, actor: &ActorId, scope: &Scope, target: &ActorId, role_id: RoleId) {
        let event = AuditEvent::new(AuditEventType::RoleAssigned, actor, scope, AuditResult::Success)
            .with_target_actor(target)
            .with_role(role_id);
        self.log_event(event).await;
    }

    pub async fn log_role_unassigned(&self, actor: &ActorId, scope: &Scope, target: &ActorId, role_id: RoleId) {
        let event = AuditEvent::new(AuditEventType::RoleUnassigned, actor, scope, AuditResult::Success)
            .with_target_actor(target)
            .with_role(role_id);
        self.log_event(event).await;
    }

    pub async fn log_actor_removed(&self, actor: &ActorId, scope: &Scope, target: &ActorId, assignments: usize) {
        let event = AuditEvent::new(AuditEventType::ActorRemoved, actor, scope, AuditResult::Success)
            .with_target_actor(target)
            .with_detail("assignments", assignments.to_string());
        self.log_event(event).await;
    }

    /// Record a refused mutation along with the error code that refused it
    pub async fn log_mutation_rejected(&self, actor: &ActorId, scope: &Scope, operation: &str, code: &str) {
        let result = if code == "forbidden" { AuditResult::Denied } else { AuditResult::Failure };
        let event = AuditEvent::new(AuditEventType::MutationRejected, actor, scope, result)
            .with_detail("operation", operation)
            .with_detail("code", code);
        self.log_event(event).await;
    }

    /// Most recent events first
    pub async fn get_events(&self, limit: Option<usize>) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.iter().rev().take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    /// Events performed by or targeting `actor`, most recent first
    pub async fn get_actor_events(&self, actor: &ActorId, limit: Option<usize>) -> Vec<AuditEvent> {
        let events = self.events.read().await;

        events
            .iter()
            .rev()
            .filter(|event| event.actor == *actor || event.target_actor.as_ref() == Some(actor))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub async fn get_events_by_type(&self, event_type: AuditEventType, limit: Option<usize>) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.iter().rev().filter(|event| event.event_type == event_type).take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    pub async fn clear_events(&self) {
        self.events.write().await.clear();
        info!("Audit log cleared");
    }

    pub async fn get_statistics(&self) -> AuditStatistics {
        let events = self.events.read().await;

        let mut stats = AuditStatistics {
            total_events: events.len(),
            ..Default::default()
        };

        for event in events.iter() {
            match event.result {
                AuditResult::Success => stats.successful_events += 1,
                AuditResult::Failure => stats.failed_events += 1,
                AuditResult::Denied => stats.denied_events += 1,
            }

            *stats.events_by_type.entry(event.event_type).or_insert(0) += 1;
        }

        stats
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Audit statistics
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuditStatistics {
    pub total_events: usize,
    pub successful_events: usize,
    pub failed_events: usize,
    pub denied_events: usize,
    pub events_by_type: HashMap<AuditEventType, usize>,
}
