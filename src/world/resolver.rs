use std::sync::Arc;

use crate::error::{AggregatorError, Result};
use crate::geometry::SE3;
use crate::observation::{ObservationKey, ObservationStore};

use super::TransformService;

/// Expresses the latest observation for a key in the world frame.
///
/// Nothing is cached: each call re-reads the store and asks the transform
/// service again.
pub struct WorldPoseResolver {
    store: Arc<ObservationStore>,
    transforms: Arc<dyn TransformService>,
    world_frame: String,
}

impl WorldPoseResolver {
    pub fn new(
        store: Arc<ObservationStore>,
        transforms: Arc<dyn TransformService>,
        world_frame: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transforms,
            world_frame: world_frame.into(),
        }
    }

    pub fn world_frame(&self) -> &str {
        &self.world_frame
    }

    /// `Ok(None)` when nothing has been observed for `key`.
    pub fn resolve_world_pose(&self, key: &ObservationKey) -> Result<Option<SE3>> {
        let Some(latest) = self.store.most_recent(key) else {
            return Ok(None);
        };

        self.transforms
            .transform(&latest.pose, &latest.source_frame_id, &self.world_frame)
            .map(Some)
            .map_err(|source| AggregatorError::TransformUnavailable {
                key: key.clone(),
                source,
            })
    }
}
