use std::collections::HashMap;
use std::fmt::Debug;

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::campaign::CampaignId;
use crate::config::RotationConfig;
use crate::sender::SenderId;

/// Chooses which member of a campaign's sender pool handles the next send.
pub trait Rotation: Debug + Send + Sync {
    /// Returns `None` only when `pool` is empty.
    fn select<'a>(
        &mut self,
        campaign_id: &CampaignId,
        pool: &'a [SenderId],
        rng: &mut dyn RngCore,
    ) -> Option<&'a SenderId>;
}

pub fn from_config(config: RotationConfig) -> Box<dyn Rotation> {
    match config {
        RotationConfig::Uniform => Box::new(UniformRotation),
        RotationConfig::RoundRobin => Box::new(RoundRobinRotation::default()),
    }
}

/// Independent uniform choice on every call, with no memory of earlier
/// picks. Small pools can see uneven load over short runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformRotation;

impl Rotation for UniformRotation {
    fn select<'a>(
        &mut self,
        _campaign_id: &CampaignId,
        pool: &'a [SenderId],
        rng: &mut dyn RngCore,
    ) -> Option<&'a SenderId> {
        pool.choose(rng)
    }
}

/// Walks each campaign's pool in order. Cursors live only as long as the
/// dispatcher, so a restart begins again at the head of every pool.
#[derive(Clone, Debug, Default)]
pub struct RoundRobinRotation {
    cursors: HashMap<CampaignId, usize>,
}

impl Rotation for RoundRobinRotation {
    fn select<'a>(
        &mut self,
        campaign_id: &CampaignId,
        pool: &'a [SenderId],
        _rng: &mut dyn RngCore,
    ) -> Option<&'a SenderId> {
        if pool.is_empty() {
            return None;
        }

        let cursor = self.cursors.entry(campaign_id.clone()).or_insert(0);
        let selected = &pool[*cursor % pool.len()];
        *cursor = cursor.wrapping_add(1);

        Some(selected)
    }
}
