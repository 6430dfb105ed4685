use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::moderation::{self, FlagSummary};
use crate::BotError;

/// Models for the guild store.
///
/// These are the persisted shapes; one JSON document per guild holds all of
/// them (see [`models::GuildData`]).
pub mod models;

use models::*;

/// The JSON-file-backed guild store.
///
/// Each guild's state is a single document at `<root>/<guild_id>.json`.
/// Writes go through a temp file and an atomic rename, serialized by a
/// store-wide lock. Every mutation re-reads the document from disk first, so
/// handlers interleaving at await points cannot lose updates.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, BotError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!("Opened guild store at {}", root.display());
        Ok(Self {
            root,
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn guild_path(&self, guild_id: u64) -> PathBuf {
        self.root.join(format!("{}.json", guild_id))
    }

    async fn load(&self, guild_id: u64) -> Result<GuildData, BotError> {
        let path = self.guild_path(guild_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GuildData::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, guild_id: u64, data: &GuildData) -> Result<(), BotError> {
        let path = self.guild_path(guild_id);
        let tmp = self.root.join(format!("{}.json.tmp", guild_id));
        let bytes = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read-only snapshot of a guild's document.
    pub async fn read_guild(&self, guild_id: u64) -> Result<GuildData, BotError> {
        self.load(guild_id).await
    }

    /// Every guild id with a stored document.
    pub async fn guild_ids(&self) -> Result<Vec<u64>, BotError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".json") {
                if let Ok(id) = stem.parse::<u64>() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Atomically apply `f` to the current guild document and persist the
    /// result. The document is re-read from disk under the store lock, so
    /// the closure always sees the latest persisted value.
    ///
    /// Domain failures (`Err` from the closure) are returned in the inner
    /// `Result` and persist nothing.
    pub async fn with_guild<T, E, F>(&self, guild_id: u64, f: F) -> Result<Result<T, E>, BotError>
    where
        F: FnOnce(&mut GuildData) -> Result<T, E>,
    {
        let _guard = self.lock.lock().await;
        let mut data = self.load(guild_id).await?;
        match f(&mut data) {
            Ok(value) => {
                self.save(guild_id, &data).await?;
                Ok(Ok(value))
            }
            Err(e) => Ok(Err(e)),
        }
    }
}

/// Guild configuration access.
#[allow(async_fn_in_trait)]
pub trait ConfigStore {
    type Error;

    async fn get_config(&self, guild_id: u64) -> Result<GuildConfig, Self::Error>;

    /// Applies `f` to the guild config and persists it.
    async fn update_config<F>(&self, guild_id: u64, f: F) -> Result<GuildConfig, Self::Error>
    where
        F: FnOnce(&mut GuildConfig);
}

impl ConfigStore for JsonStore {
    type Error = BotError;

    async fn get_config(&self, guild_id: u64) -> Result<GuildConfig, Self::Error> {
        Ok(self.load(guild_id).await?.config)
    }

    async fn update_config<F>(&self, guild_id: u64, f: F) -> Result<GuildConfig, Self::Error>
    where
        F: FnOnce(&mut GuildConfig),
    {
        let updated = self
            .with_guild(guild_id, |data| {
                f(&mut data.config);
                Ok::<_, BotError>(data.config.clone())
            })
            .await??;
        Ok(updated)
    }
}

/// Tournament access.
#[allow(async_fn_in_trait)]
pub trait TournamentStore {
    type Error;

    async fn get_tournaments(
        &self,
        guild_id: u64,
    ) -> Result<BTreeMap<String, Tournament>, Self::Error>;

    async fn get_tournament(
        &self,
        guild_id: u64,
        id: &str,
    ) -> Result<Option<Tournament>, Self::Error>;

    async fn insert_tournament(
        &self,
        guild_id: u64,
        id: String,
        tournament: Tournament,
    ) -> Result<(), Self::Error>;

    /// Atomic read-modify-write of a single tournament. The closure receives
    /// `None` when the id is unknown and decides the domain error itself.
    async fn with_tournament<T, E, F>(
        &self,
        guild_id: u64,
        id: &str,
        f: F,
    ) -> Result<Result<T, E>, Self::Error>
    where
        F: FnOnce(Option<&mut Tournament>) -> Result<T, E>;
}

impl TournamentStore for JsonStore {
    type Error = BotError;

    async fn get_tournaments(
        &self,
        guild_id: u64,
    ) -> Result<BTreeMap<String, Tournament>, Self::Error> {
        Ok(self.load(guild_id).await?.tournaments)
    }

    async fn get_tournament(
        &self,
        guild_id: u64,
        id: &str,
    ) -> Result<Option<Tournament>, Self::Error> {
        Ok(self.load(guild_id).await?.tournaments.get(id).cloned())
    }

    async fn insert_tournament(
        &self,
        guild_id: u64,
        id: String,
        tournament: Tournament,
    ) -> Result<(), Self::Error> {
        self.with_guild(guild_id, |data| {
            data.tournaments.insert(id, tournament);
            Ok::<_, BotError>(())
        })
        .await?
    }

    async fn with_tournament<T, E, F>(
        &self,
        guild_id: u64,
        id: &str,
        f: F,
    ) -> Result<Result<T, E>, Self::Error>
    where
        F: FnOnce(Option<&mut Tournament>) -> Result<T, E>,
    {
        self.with_guild(guild_id, |data| f(data.tournaments.get_mut(id)))
            .await
    }
}

/// Giveaway access.
#[allow(async_fn_in_trait)]
pub trait GiveawayStore {
    type Error;

    async fn get_giveaways(&self, guild_id: u64) -> Result<BTreeMap<String, Giveaway>, Self::Error>;

    async fn get_giveaway(&self, guild_id: u64, id: &str) -> Result<Option<Giveaway>, Self::Error>;

    async fn insert_giveaway(
        &self,
        guild_id: u64,
        id: String,
        giveaway: Giveaway,
    ) -> Result<(), Self::Error>;

    /// Atomic read-modify-write of a single giveaway; see
    /// [`TournamentStore::with_tournament`].
    async fn with_giveaway<T, E, F>(
        &self,
        guild_id: u64,
        id: &str,
        f: F,
    ) -> Result<Result<T, E>, Self::Error>
    where
        F: FnOnce(Option<&mut Giveaway>) -> Result<T, E>;
}

impl GiveawayStore for JsonStore {
    type Error = BotError;

    async fn get_giveaways(&self, guild_id: u64) -> Result<BTreeMap<String, Giveaway>, Self::Error> {
        Ok(self.load(guild_id).await?.giveaways)
    }

    async fn get_giveaway(&self, guild_id: u64, id: &str) -> Result<Option<Giveaway>, Self::Error> {
        Ok(self.load(guild_id).await?.giveaways.get(id).cloned())
    }

    async fn insert_giveaway(
        &self,
        guild_id: u64,
        id: String,
        giveaway: Giveaway,
    ) -> Result<(), Self::Error> {
        self.with_guild(guild_id, |data| {
            data.giveaways.insert(id, giveaway);
            Ok::<_, BotError>(())
        })
        .await?
    }

    async fn with_giveaway<T, E, F>(
        &self,
        guild_id: u64,
        id: &str,
        f: F,
    ) -> Result<Result<T, E>, Self::Error>
    where
        F: FnOnce(Option<&mut Giveaway>) -> Result<T, E>,
    {
        self.with_guild(guild_id, |data| f(data.giveaways.get_mut(id)))
            .await
    }
}

/// Warning-flag and alt-link access.
#[allow(async_fn_in_trait)]
pub trait ModerationStore {
    type Error;

    /// Stores a flag and returns its id.
    async fn add_flag(
        &self,
        guild_id: u64,
        user_id: &str,
        moderator_id: &str,
        reason: &str,
        priority: FlagPriority,
        expiry_days: i64,
        now: i64,
    ) -> Result<u64, Self::Error>;

    /// Active flags for a user. Expired flags are pruned as a side effect.
    async fn user_flags(&self, guild_id: u64, user_id: &str, now: i64)
        -> Result<Vec<Flag>, Self::Error>;

    /// Per-user summaries of all active flags.
    async fn all_flagged(&self, guild_id: u64, now: i64) -> Result<Vec<FlagSummary>, Self::Error>;

    async fn remove_flag(&self, guild_id: u64, flag_id: u64) -> Result<Option<Flag>, Self::Error>;

    /// Removes every flag on a user, returning how many were removed.
    async fn clear_flags(&self, guild_id: u64, user_id: &str) -> Result<usize, Self::Error>;

    /// Drops expired flags, returning how many were pruned.
    async fn prune_expired_flags(&self, guild_id: u64, now: i64) -> Result<usize, Self::Error>;

    /// Links two users bidirectionally. Returns false when already linked.
    async fn link_alts(
        &self,
        guild_id: u64,
        user_a: &str,
        user_b: &str,
        reason: Option<String>,
        linked_by: &str,
        now: i64,
    ) -> Result<bool, Self::Error>;

    /// Removes both directions of a link. Returns false when none existed.
    async fn unlink_alts(&self, guild_id: u64, user_a: &str, user_b: &str)
        -> Result<bool, Self::Error>;

    async fn alt_links(&self, guild_id: u64, user_id: &str) -> Result<Vec<AltLink>, Self::Error>;
}

impl ModerationStore for JsonStore {
    type Error = BotError;

    async fn add_flag(
        &self,
        guild_id: u64,
        user_id: &str,
        moderator_id: &str,
        reason: &str,
        priority: FlagPriority,
        expiry_days: i64,
        now: i64,
    ) -> Result<u64, Self::Error> {
        self.with_guild(guild_id, |data| {
            let id = data.next_flag_id;
            data.next_flag_id += 1;
            data.flags.push(Flag {
                id,
                user_id: user_id.to_string(),
                moderator_id: moderator_id.to_string(),
                reason: reason.to_string(),
                created_at: now,
                expires_at: now + expiry_days * 86_400,
                priority,
            });
            Ok::<_, BotError>(id)
        })
        .await?
    }

    async fn user_flags(
        &self,
        guild_id: u64,
        user_id: &str,
        now: i64,
    ) -> Result<Vec<Flag>, Self::Error> {
        self.prune_expired_flags(guild_id, now).await?;
        let data = self.load(guild_id).await?;
        Ok(data
            .flags
            .into_iter()
            .filter(|f| f.user_id == user_id)
            .collect())
    }

    async fn all_flagged(&self, guild_id: u64, now: i64) -> Result<Vec<FlagSummary>, Self::Error> {
        self.prune_expired_flags(guild_id, now).await?;
        let data = self.load(guild_id).await?;
        Ok(moderation::summarize_flags(&data.flags))
    }

    async fn remove_flag(&self, guild_id: u64, flag_id: u64) -> Result<Option<Flag>, Self::Error> {
        self.with_guild(guild_id, |data| {
            let removed = data
                .flags
                .iter()
                .position(|f| f.id == flag_id)
                .map(|i| data.flags.remove(i));
            Ok::<_, BotError>(removed)
        })
        .await?
    }

    async fn clear_flags(&self, guild_id: u64, user_id: &str) -> Result<usize, Self::Error> {
        self.with_guild(guild_id, |data| {
            let before = data.flags.len();
            data.flags.retain(|f| f.user_id != user_id);
            Ok::<_, BotError>(before - data.flags.len())
        })
        .await?
    }

    async fn prune_expired_flags(&self, guild_id: u64, now: i64) -> Result<usize, Self::Error> {
        self.with_guild(guild_id, |data| {
            let before = data.flags.len();
            data.flags.retain(|f| f.expires_at > now);
            Ok::<_, BotError>(before - data.flags.len())
        })
        .await?
    }

    async fn link_alts(
        &self,
        guild_id: u64,
        user_a: &str,
        user_b: &str,
        reason: Option<String>,
        linked_by: &str,
        now: i64,
    ) -> Result<bool, Self::Error> {
        self.with_guild(guild_id, |data| {
            Ok::<_, BotError>(moderation::link_alts(
                &mut data.alts,
                user_a,
                user_b,
                reason,
                linked_by,
                now,
            ))
        })
        .await?
    }

    async fn unlink_alts(
        &self,
        guild_id: u64,
        user_a: &str,
        user_b: &str,
    ) -> Result<bool, Self::Error> {
        self.with_guild(guild_id, |data| {
            Ok::<_, BotError>(moderation::unlink_alts(&mut data.alts, user_a, user_b))
        })
        .await?
    }

    async fn alt_links(&self, guild_id: u64, user_id: &str) -> Result<Vec<AltLink>, Self::Error> {
        let data = self.load(guild_id).await?;
        Ok(data.alts.get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn sample_giveaway() -> Giveaway {
        Giveaway {
            prize: "Nitro".to_string(),
            description: None,
            host_id: "1".to_string(),
            channel_id: "2".to_string(),
            winners_count: 1,
            prize_code: "abc".to_string(),
            claim_timeout_seconds: 60,
            end_timestamp: 100,
            entries: Default::default(),
            status: GiveawayStatus::Open,
            winners_picked: Vec::new(),
            winners_claimed: Vec::new(),
            required_role_id: None,
            nitro_bonus: false,
            bonus_role_id: None,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn missing_guild_reads_as_default() {
        let (_dir, store) = store();
        let data = store.read_guild(42).await.unwrap();
        assert!(data.giveaways.is_empty());
        assert_eq!(data.next_flag_id, 1);
    }

    #[tokio::test]
    async fn mutations_survive_reload() {
        let (_dir, store) = store();
        store
            .insert_giveaway(42, "42_1".to_string(), sample_giveaway())
            .await
            .unwrap();

        let fetched = store.get_giveaway(42, "42_1").await.unwrap().unwrap();
        assert_eq!(fetched.prize, "Nitro");
        assert_eq!(store.guild_ids().await.unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn domain_error_persists_nothing() {
        let (_dir, store) = store();
        store
            .insert_giveaway(42, "42_1".to_string(), sample_giveaway())
            .await
            .unwrap();

        let outcome: Result<(), &str> = store
            .with_giveaway(42, "42_1", |g| {
                let g = g.unwrap();
                g.entries.insert("999".to_string(), 1);
                Err("rejected")
            })
            .await
            .unwrap();
        assert!(outcome.is_err());

        let fetched = store.get_giveaway(42, "42_1").await.unwrap().unwrap();
        assert!(fetched.entries.is_empty());
    }

    #[tokio::test]
    async fn flag_ids_are_monotonic() {
        let (_dir, store) = store();
        let a = store
            .add_flag(7, "100", "200", "first", FlagPriority::Manual, 30, 0)
            .await
            .unwrap();
        let b = store
            .add_flag(7, "100", "200", "second", FlagPriority::High, 7, 0)
            .await
            .unwrap();
        assert_eq!((a, b), (1, 2));

        store.remove_flag(7, 1).await.unwrap();
        let c = store
            .add_flag(7, "101", "200", "third", FlagPriority::Manual, 30, 0)
            .await
            .unwrap();
        assert_eq!(c, 3);
    }
}
