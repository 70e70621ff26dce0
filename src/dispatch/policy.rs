use std::fmt::Debug;

use crate::campaign::Campaign;
use crate::config::CompletionConfig;

/// Decides, after each delivery, whether a sending campaign is finished.
///
/// `audience` is the number of contacts the campaign could be delivered to
/// on the tick that just ran.
pub trait CompletionPolicy: Debug + Send + Sync {
    fn is_complete(&self, campaign: &Campaign, audience: usize) -> bool;
}

pub fn from_config(config: CompletionConfig) -> Box<dyn CompletionPolicy> {
    match config {
        CompletionConfig::Never => Box::new(NeverComplete),
        CompletionConfig::Attempts { target } => Box::new(AttemptTarget { target }),
        CompletionConfig::Audience => Box::new(AudienceExhausted),
    }
}

/// Campaigns keep sending until an editor stops them.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverComplete;

impl CompletionPolicy for NeverComplete {
    fn is_complete(&self, _campaign: &Campaign, _audience: usize) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AttemptTarget {
    pub target: u64,
}

impl CompletionPolicy for AttemptTarget {
    fn is_complete(&self, campaign: &Campaign, _audience: usize) -> bool {
        campaign.stats.attempts() >= self.target
    }
}

/// Complete once there have been as many attempts as reachable contacts.
#[derive(Clone, Copy, Debug, Default)]
pub struct AudienceExhausted;

impl CompletionPolicy for AudienceExhausted {
    fn is_complete(&self, campaign: &Campaign, audience: usize) -> bool {
        campaign.stats.attempts() >= audience as u64
    }
}
