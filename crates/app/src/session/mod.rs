//! Room session controller
//!
//! Owns the client's view of one room. `room` and `users` are only ever
//! written from subscription pushes, apart from the local stand-in set
//! right after a create or join. Failures are returned to the caller and
//! also recorded in the published state; they never move the session off
//! its previous room.

mod state;
mod sync;


use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use planit_core::permissions::{PermissionMatrix, RoomAction};
use planit_core::stats::VoteStatistics;
use planit_core::{
    series, Database, Error, LocalStateRepository, Result, Room, RoomCode, RoomUser,
    SeriesType, SessionConfig, VoteValue,
};
use planit_store::{RoomStore, RoomWatch, UsersWatch};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::identity::{Identity, IdentityProvider};
use crate::link::ShareLink;

pub use state::{SessionPhase, SessionState};
pub use sync::ROOM_NOT_FOUND;

pub struct RoomSession {
    state: Arc<watch::Sender<SessionState>>,
    rooms: RoomStore,
    identity: Arc<dyn IdentityProvider>,
    local: Arc<Mutex<Database>>,
    config: SessionConfig,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl RoomSession {
    pub fn new(
        rooms: RoomStore,
        identity: Arc<dyn IdentityProvider>,
        local: Arc<Mutex<Database>>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(state),
            rooms,
            identity,
            local,
            config,
            sync_task: Mutex::new(None),
        }
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The caller's own participant record, once pushed
    pub fn current_user(&self) -> Option<RoomUser> {
        let identity = self.identity.current()?;
        self.state.borrow().user(&identity.uid).cloned()
    }

    /// Link to the current room
    pub fn share_link(&self, base_url: &str) -> Option<ShareLink> {
        let code = self.state.borrow().room_code()?.clone();
        Some(ShareLink::new(base_url, code))
    }

    /// Create a room with a catalog series and join it as admin
    #[instrument(skip(self))]
    pub async fn create_room(&self, series_type: SeriesType) -> Result<RoomCode> {
        let result = self.create_room_inner(series_type).await;
        self.finish(result)
    }

    async fn create_room_inner(&self, series_type: SeriesType) -> Result<RoomCode> {
        let identity = self.wait_for_identity().await?;
        self.set_loading();

        let series = series::values_for(series_type);
        let code = self
            .rooms
            .create_room(&identity.uid, &series, series_type)
            .await?;
        self.rooms
            .join_room(&code, &identity.uid, &identity.display_name, true)
            .await?;

        let watches = self.open_watches(&code).await?;
        self.with_local(|db| db.set_current_room(&code))?;

        let room = Room {
            created_by: identity.uid.clone(),
            active_series: series,
            series_type,
            ..Room::placeholder(code.clone())
        };
        self.bind(code.clone(), room, watches);
        info!(room_id = %code, user_id = %identity.uid, "Created room");
        Ok(code)
    }

    /// Join an existing room as a voter. `input` is a room code in any case.
    #[instrument(skip(self))]
    pub async fn join_room(&self, input: &str) -> Result<RoomCode> {
        let result = self.join_room_inner(input).await;
        self.finish(result)
    }

    async fn join_room_inner(&self, input: &str) -> Result<RoomCode> {
        let code = RoomCode::parse(input)?;
        let identity = self.wait_for_identity().await?;
        self.set_loading();

        if !self.rooms.room_exists(&code).await? {
            return Err(Error::RoomNotFound);
        }
        self.rooms
            .join_room(&code, &identity.uid, &identity.display_name, false)
            .await?;

        let watches = self.open_watches(&code).await?;
        self.with_local(|db| db.set_current_room(&code))?;

        self.bind(code.clone(), Room::placeholder(code.clone()), watches);
        info!(room_id = %code, user_id = %identity.uid, "Joined room");
        Ok(code)
    }

    /// Resume the room recorded by an earlier run, if there is one and an
    /// identity is available. Membership is not re-checked.
    pub async fn restore(&self) -> Result<Option<RoomCode>> {
        if let Some(code) = self.state.borrow().room_code() {
            return Ok(Some(code.clone()));
        }
        let Some(code) = self.with_local(|db| db.current_room())? else {
            return Ok(None);
        };
        if self.identity.current().is_none() {
            debug!(room_id = %code, "No identity, not restoring room");
            return Ok(None);
        }

        let result = self.open_watches(&code).await;
        let watches = self.record(result)?;
        self.bind(code.clone(), Room::placeholder(code.clone()), watches);
        info!(room_id = %code, "Restored room");
        Ok(Some(code))
    }

    /// Drop the room locally. The participant record stays in the store.
    pub fn leave_room(&self) -> Result<()> {
        self.stop_sync();
        let cleared = self.with_local(|db| db.clear_current_room());
        let code = self.state.borrow().room_code().cloned();
        self.state.send_modify(|s| {
            s.epoch += 1;
            s.phase = SessionPhase::Unbound;
            s.room = None;
            s.users.clear();
            s.loading = false;
            s.error = None;
        });
        if let Some(code) = code {
            info!(room_id = %code, "Left room");
        }
        self.record(cleared)
    }

    /// Record the caller's vote. The value is not checked against the
    /// room's series.
    pub async fn submit_vote(&self, vote: VoteValue) -> Result<()> {
        let result = async {
            let code = self.require_room()?;
            let identity = self.identity.current().ok_or(Error::AuthPending)?;
            self.rooms.update_vote(&code, &identity.uid, &vote).await?;
            debug!(room_id = %code, "Vote submitted");
            Ok::<_, Error>(())
        }
        .await;
        self.record(result)
    }

    pub async fn reveal_votes(&self) -> Result<()> {
        let result = async {
            let (code, _) = self.require_admin(RoomAction::RevealVotes)?;
            self.rooms.reveal_votes(&code).await?;
            info!(room_id = %code, "Votes revealed");
            Ok::<_, Error>(())
        }
        .await;
        self.record(result)
    }

    /// Hide votes, then clear every participant known right now.
    ///
    /// The flag and the clears are separate writes, so observers may see
    /// an unrevealed room that still holds votes until the clears land.
    pub async fn reset_votes(&self) -> Result<()> {
        let result = async {
            let (code, users) = self.require_admin(RoomAction::ResetVotes)?;
            self.rooms.reset_votes(&code).await?;
            self.clear_votes(&code, &users).await?;
            info!(room_id = %code, cleared = users.len(), "Votes reset");
            Ok::<_, Error>(())
        }
        .await;
        self.record(result)
    }

    /// Switch the room to another series and clear every vote.
    ///
    /// Custom series must pass [`series::validate_custom`]; catalog types
    /// must carry exactly their catalog values.
    pub async fn update_series(&self, values: Vec<VoteValue>, series_type: SeriesType) -> Result<()> {
        let result = async {
            let (code, users) = self.require_admin(RoomAction::ChangeSeries)?;
            if series_type == SeriesType::Custom {
                series::validate_custom(&values)?;
            } else if values != series::values_for(series_type) {
                return Err(Error::validation(format!(
                    "Values do not match the {} series",
                    series::name_for(series_type)
                )));
            }

            self.rooms
                .update_estimation_series(&code, &values, series_type)
                .await?;
            self.clear_votes(&code, &users).await?;
            info!(room_id = %code, series = %series_type, "Series updated");
            Ok::<_, Error>(())
        }
        .await;
        self.record(result)
    }

    /// Switch to a catalog series
    pub async fn select_series(&self, series_type: SeriesType) -> Result<()> {
        if series_type == SeriesType::Custom {
            return self.record(Err(Error::validation(
                "A custom series needs its values",
            )));
        }
        self.update_series(series::values_for(series_type), series_type)
            .await
    }

    /// Statistics for the current round; nothing unless revealed and voted
    pub fn get_statistics(&self) -> Option<VoteStatistics> {
        self.state.borrow().statistics()
    }

    async fn wait_for_identity(&self) -> Result<Identity> {
        let mut attempts = 0;
        loop {
            if let Some(identity) = self.identity.current() {
                return Ok(identity);
            }
            if attempts >= self.config.identity_poll_attempts {
                warn!(attempts, "No identity available");
                return Err(Error::AuthPending);
            }
            tokio::time::sleep(self.config.identity_poll_interval()).await;
            attempts += 1;
        }
    }

    fn require_room(&self) -> Result<RoomCode> {
        self.state
            .borrow()
            .room_code()
            .cloned()
            .ok_or(Error::NotInRoom)
    }

    /// Room code and the participants known now, if the caller may act
    fn require_admin(&self, action: RoomAction) -> Result<(RoomCode, Vec<RoomUser>)> {
        let code = self.require_room()?;
        let uid = self.identity.current().map(|i| i.uid);
        let state = self.state.borrow();
        let caller = uid.as_deref().and_then(|uid| state.user(uid));
        PermissionMatrix::require(caller, action)?;
        Ok((code, state.users.clone()))
    }

    /// Clear each participant concurrently. Every clear runs to completion;
    /// the first failure is returned.
    async fn clear_votes(&self, code: &RoomCode, users: &[RoomUser]) -> Result<()> {
        let clears = users
            .iter()
            .map(|u| self.rooms.clear_user_vote(code, &u.user_id));
        for result in join_all(clears).await {
            result?;
        }
        Ok(())
    }

    async fn open_watches(&self, code: &RoomCode) -> Result<(RoomWatch, UsersWatch)> {
        let room = self.rooms.subscribe_to_room(code).await?;
        let users = self.rooms.subscribe_to_room_users(code).await?;
        Ok((room, users))
    }

    /// Switch to `code` with `room` as the local stand-in and start syncing
    fn bind(&self, code: RoomCode, room: Room, (room_watch, users_watch): (RoomWatch, UsersWatch)) {
        self.stop_sync();

        let mut epoch = 0;
        self.state.send_modify(|s| {
            s.epoch += 1;
            epoch = s.epoch;
            s.phase = SessionPhase::Pending;
            s.room = Some(room);
            s.users.clear();
            s.error = None;
        });

        let binding = sync::Binding {
            code,
            epoch,
            state: self.state.clone(),
            local: self.local.clone(),
        };
        let handle = tokio::spawn(sync::run(binding, room_watch, users_watch));
        *self.sync_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn stop_sync(&self) {
        let previous = self
            .sync_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = previous {
            handle.abort();
        }
    }

    fn with_local<T>(&self, f: impl FnOnce(&dyn LocalStateRepository) -> Result<T>) -> Result<T> {
        let db = self.local.lock().unwrap_or_else(PoisonError::into_inner);
        f(&*db)
    }

    fn set_loading(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
        self.record(result)
    }

    fn record<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(error = %e, "Room operation failed");
            let message = e.to_string();
            self.state.send_modify(|s| s.error = Some(message));
        }
        result
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.stop_sync();
    }
}
