use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Approval, EventScope, Store, StoreError, StoreResult};
use crate::models::{Availability, Event, NewEvent, User};

#[derive(Default)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    users: HashMap<Uuid, User>,
    availability: Vec<Availability>,
}

impl MemoryState {
    fn overlapping(&self, start: DateTime<Utc>, end: DateTime<Utc>, exclude_id: Option<Uuid>) -> bool {
        self.events
            .values()
            .any(|event| event.blocks(start, end, exclude_id))
    }
}

/// In-process store. Check and write happen under a single write lock, so
/// it upholds the same no-overlap guarantee as the database.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn add_availability(&self, window: Availability) {
        self.state.write().await.availability.push(window);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_events(&self, scope: EventScope) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|event| match scope {
                EventScope::All => true,
                EventScope::VisibleTo(user_id) => event.is_approved || event.is_owned_by(user_id),
            })
            .cloned()
            .collect();
        events.sort_by_key(|event| (event.start, event.created_at));
        Ok(events)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn is_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool> {
        Ok(self.state.read().await.overlapping(start, end, exclude_id))
    }

    async fn insert_event(&self, new: NewEvent, check_overlap: bool) -> StoreResult<Event> {
        let mut state = self.state.write().await;
        if (check_overlap || new.is_approved()) && state.overlapping(new.start, new.end, None) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            is_approved: new.is_approved(),
            name: new.name,
            start: new.start,
            end: new.end,
            description: new.description,
            created_by: new.created_by,
            approved_at: new.approved_at,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn save_event(&self, event: &Event, check_overlap: bool) -> StoreResult<Event> {
        let mut state = self.state.write().await;
        let approved = match state.events.get(&event.id) {
            Some(stored) => stored.is_approved,
            None => return Err(StoreError::NotFound),
        };
        if (check_overlap || approved) && state.overlapping(event.start, event.end, Some(event.id)) {
            return Err(StoreError::Conflict);
        }

        let stored = state.events.get_mut(&event.id).ok_or(StoreError::NotFound)?;
        stored.name = event.name.clone();
        stored.start = event.start;
        stored.end = event.end;
        stored.description = event.description.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn approve_event(&self, id: Uuid, approved_at: DateTime<Utc>) -> StoreResult<Approval> {
        let mut state = self.state.write().await;
        let (start, end) = match state.events.get(&id) {
            Some(event) if event.is_approved => return Ok(Approval::Unchanged(event.clone())),
            Some(event) => (event.start, event.end),
            None => return Err(StoreError::NotFound),
        };
        if state.overlapping(start, end, Some(id)) {
            return Err(StoreError::Conflict);
        }

        let event = state.events.get_mut(&id).ok_or(StoreError::NotFound)?;
        event.is_approved = true;
        event.approved_at = Some(approved_at);
        event.updated_at = approved_at;
        Ok(Approval::Granted(event.clone()))
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        self.state
            .write()
            .await
            .events
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_clients(&self) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut clients: Vec<User> = state
            .users
            .values()
            .filter(|user| !user.is_staff)
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(clients)
    }

    async fn list_availability(&self) -> StoreResult<Vec<Availability>> {
        let mut windows = self.state.read().await.availability.clone();
        windows.sort_by_key(|window| (window.weekday, window.start_time));
        Ok(windows)
    }
}
