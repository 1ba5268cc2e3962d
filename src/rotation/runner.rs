use rand::Rng;

use crate::{
    catalog::{CatalogClient, Session},
    config::{ReadFailurePolicy, RotationConfig, RotationStrategy, SourceConfig},
    error::{CatalogError, RotationError},
    schema::{CollectionId, ItemId, RotationPlan, RotationReport, SampledSegment},
};

use super::{
    differ::items_to_remove,
    mutator::{add_all, remove_all},
    reader::read_all,
    sampler::{sample, sample_collection},
};

/// Report labels for the non-sampled collections.
const CARRY_OVER_LABEL: &str = "carry-over";
const DESTINATION_LABEL: &str = "destination";

/// Point-in-time copy of a collection.
struct Snapshot {
    items: Vec<ItemId>,

    /// The read failed and `items` is an empty stand-in
    degraded: bool,
}

/// Drives one rotation of the destination collection.
///
/// The run is a straight line with no back-edges:
/// 1. Authenticate (fatal on failure)
/// 2. Log the identity (best effort)
/// 3. Read snapshots and build a `RotationPlan`
/// 4. Apply the plan, strictly sequentially
///
/// Any error after the first mutation still fails the whole run.
/// Nothing that already landed at the remote is undone.
///
/// This type does NOT:
/// - Detect concurrent edits of the destination
/// - Serialize overlapping runs (the scheduler's job)
pub struct Rotator {
    config: RotationConfig,
    dry_run: bool,
}

impl Rotator {
    pub fn new(config: RotationConfig) -> Self {
        Self { config, dry_run: false }
    }

    /// Build and log the plan, but skip every mutation.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub async fn run<R>(
        &self,
        client: &dyn CatalogClient,
        rng: &mut R,
    ) -> Result<RotationReport, RotationError>
    where
        R: Rng + ?Sized,
    {
        log::info!("Refreshing access token...");
        let token = client
            .refresh_access_token()
            .await
            .map_err(RotationError::Auth)?;
        log::info!("Access token refreshed successfully");

        let session = Session::new(client, token);

        match session.current_identity().await {
            Ok(me) => log::info!(
                "Authenticated as: {} ({})",
                me.display_name.as_deref().unwrap_or("<no display name>"),
                me.id
            ),
            Err(e) => log::warn!("Could not look up the current user: {e}"),
        }

        self.log_collections();

        let plan = match self.config.strategy {
            RotationStrategy::FullReset => self.plan_full_reset(&session, rng).await?,
            RotationStrategy::Differential => self.plan_differential(&session, rng).await?,
        };

        if self.dry_run {
            log::info!(
                "Dry run ({:?}): would clear={} remove={} carry over={} add={}",
                plan.strategy,
                plan.reset,
                plan.removals.len(),
                plan.carry_over.len(),
                plan.segments.iter().map(|s| s.items.len()).sum::<usize>()
            );
            return Ok(report_for(&plan));
        }

        self.apply(&session, &plan).await
    }

    // --------------------------------------------------------
    // Planning
    // --------------------------------------------------------

    /// Variant A: carry-over snapshot plus a fresh sample per source.
    async fn plan_full_reset<R>(
        &self,
        session: &Session<'_>,
        rng: &mut R,
    ) -> Result<RotationPlan, RotationError>
    where
        R: Rng + ?Sized,
    {
        let mut carry_over = Vec::new();
        let mut unreadable = Vec::new();
        if let Some(carry) = &self.config.carry_over {
            let snap = self.snapshot(session, &carry.playlist).await?;
            if snap.degraded {
                unreadable.push(CARRY_OVER_LABEL.to_string());
            }
            carry_over = snap.items;
            log::info!("Getting {} tracks from carry-over playlist", carry_over.len());

            if carry.reverse {
                carry_over.reverse();
                log::info!("Reversed carry-over tracks so newest tracks will appear at top");
            }
        }

        let mut segments = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            let picked = match sample_collection(session, &source.playlist, source.count, rng).await {
                Ok(items) => segment(source, items, false),
                Err(e) => {
                    self.tolerate_read_failure(&source.playlist, e)?;
                    segment(source, Vec::new(), true)
                }
            };
            segments.push(picked);
        }

        Ok(RotationPlan {
            strategy: RotationStrategy::FullReset,
            reset: true,
            carry_over,
            removals: Vec::new(),
            segments,
            unreadable,
        })
    }

    /// Variant B: strip whatever came from the sources, then resample.
    ///
    /// The carry-over collection is neither read, sampled nor stripped.
    async fn plan_differential<R>(
        &self,
        session: &Session<'_>,
        rng: &mut R,
    ) -> Result<RotationPlan, RotationError>
    where
        R: Rng + ?Sized,
    {
        if let Some(carry) = &self.config.carry_over {
            log::info!(
                "Carry-over playlist {} is left untouched in differential mode",
                carry.playlist
            );
        }

        let current = self.snapshot(session, &self.config.destination).await?;
        let mut unreadable = Vec::new();
        if current.degraded {
            log::warn!("Destination could not be read: nothing will be removed before appending");
            unreadable.push(DESTINATION_LABEL.to_string());
        }

        let mut snapshots = Vec::with_capacity(self.config.sources.len());
        for source in &self.config.sources {
            snapshots.push(self.snapshot(session, &source.playlist).await?);
        }

        let sets: Vec<&[ItemId]> = snapshots.iter().map(|s| s.items.as_slice()).collect();
        let removals = items_to_remove(&current.items, &sets);
        log::info!("Found {} tracks from source playlists to remove", removals.len());

        let segments = self
            .config
            .sources
            .iter()
            .zip(&snapshots)
            .map(|(source, snap)| {
                let items = sample(&snap.items, source.count, rng);
                log::info!("Selected {} random tracks from {}", items.len(), source.name);
                segment(source, items, snap.degraded)
            })
            .collect();

        Ok(RotationPlan {
            strategy: RotationStrategy::Differential,
            reset: false,
            carry_over: Vec::new(),
            removals,
            segments,
            unreadable,
        })
    }

    async fn snapshot(
        &self,
        session: &Session<'_>,
        collection: &CollectionId,
    ) -> Result<Snapshot, RotationError> {
        match read_all(session, collection).await {
            Ok(items) => Ok(Snapshot { items, degraded: false }),
            Err(e) => {
                self.tolerate_read_failure(collection, e)?;
                Ok(Snapshot { items: Vec::new(), degraded: true })
            }
        }
    }

    /// Applies the configured read-failure policy.
    ///
    /// `Ok(())` means "carry on with an empty snapshot".
    fn tolerate_read_failure(
        &self,
        collection: &CollectionId,
        source: CatalogError,
    ) -> Result<(), RotationError> {
        match self.config.on_read_failure {
            ReadFailurePolicy::Degrade => {
                log::warn!("Continuing without tracks from playlist {collection}");
                Ok(())
            }
            ReadFailurePolicy::Abort => Err(RotationError::Read {
                collection: collection.clone(),
                source,
            }),
        }
    }

    // --------------------------------------------------------
    // Mutation
    // --------------------------------------------------------

    async fn apply(
        &self,
        session: &Session<'_>,
        plan: &RotationPlan,
    ) -> Result<RotationReport, RotationError> {
        let destination = &self.config.destination;
        let pacing = self.config.pacing();

        if plan.reset {
            log::info!("Clearing playlist {destination}...");
            session
                .replace_all(destination, &[])
                .await
                .map_err(|source| RotationError::Clear {
                    collection: destination.clone(),
                    source,
                })?;
            log::info!("Playlist cleared successfully");
        }

        if !plan.removals.is_empty() {
            remove_all(session, destination, &plan.removals, pacing).await?;
            log::info!("Removed {} tracks from source playlists", plan.removals.len());
        }

        if !plan.carry_over.is_empty() {
            add_all(session, destination, &plan.carry_over, pacing).await?;
            log::info!("Added {} carry-over tracks", plan.carry_over.len());
        }

        for segment in &plan.segments {
            log::info!(
                "New {} tracks to add: {} of {} requested (from {})",
                segment.name,
                segment.items.len(),
                segment.requested,
                segment.source
            );
        }

        let sampled = plan.sampled_items();
        if !sampled.is_empty() {
            add_all(session, destination, &sampled, pacing).await?;
            log::info!("Added {} random tracks to playlist", sampled.len());
        }

        Ok(report_for(plan))
    }

    fn log_collections(&self) {
        log::info!("Using playlist IDs ({:?}):", self.config.strategy);
        log::info!("- Destination: {}", self.config.destination);
        if let Some(carry) = &self.config.carry_over {
            log::info!("- Carry-over: {}", carry.playlist);
        }
        for source in &self.config.sources {
            log::info!("- {}: {} (count {})", source.name, source.playlist, source.count);
        }
    }
}

fn segment(source: &SourceConfig, items: Vec<ItemId>, degraded: bool) -> SampledSegment {
    SampledSegment {
        name: source.name.clone(),
        source: source.playlist.clone(),
        requested: source.count,
        items,
        degraded,
    }
}

fn report_for(plan: &RotationPlan) -> RotationReport {
    RotationReport {
        carried_over: plan.carry_over.len(),
        removed: plan.removals.len(),
        added: plan.segments.iter().map(|s| s.items.len()).sum(),
        degraded_sources: plan
            .unreadable
            .iter()
            .cloned()
            .chain(
                plan.segments
                    .iter()
                    .filter(|s| s.degraded)
                    .map(|s| s.name.clone()),
            )
            .collect(),
    }
}
