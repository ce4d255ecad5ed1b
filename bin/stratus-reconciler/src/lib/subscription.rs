// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution of the subscription a cluster's machines belong to.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use slog::{debug, warn, Logger};
use thiserror::Error;

use stratus_config::ClusterConfig;

use crate::ErrorKind;

/// Identifies a cluster object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The parts of an owning cluster the reconciler reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerCluster {
    pub name: String,
    pub subscription_id: String,
}

/// Fetches owning clusters from wherever cluster objects are stored.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OwnerLookup: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> anyhow::Result<OwnerCluster>;
}

#[derive(Debug, Error)]
pub enum ResolveSubscriptionError {
    #[error("failed to get owner cluster {key} after {attempts} attempts: {source}")]
    RetryExhausted {
        key: ObjectKey,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}

impl ResolveSubscriptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveSubscriptionError::RetryExhausted { .. } => {
                ErrorKind::RetryExhausted
            }
        }
    }
}

/// Returns the subscription ID recorded on the owning cluster.
///
/// The lookup is attempted up to `max_attempts` times (at least once), with
/// `retry_interval` between attempts. Every lookup failure is treated the
/// same way; the last one is returned once attempts run out.
pub async fn get_subscription_id(
    lookup: &dyn OwnerLookup,
    cluster_name: &str,
    namespace: &str,
    max_attempts: u32,
    retry_interval: Duration,
    log: &Logger,
) -> Result<String, ResolveSubscriptionError> {
    let key = ObjectKey {
        namespace: namespace.to_owned(),
        name: cluster_name.to_owned(),
    };
    let attempts = max_attempts.max(1);

    let mut attempt = 1;
    loop {
        match lookup.get(&key).await {
            Ok(owner) => {
                debug!(log, "resolved owner cluster subscription";
                       "cluster" => %key, "attempt" => attempt);
                return Ok(owner.subscription_id);
            }
            Err(source) if attempt >= attempts => {
                return Err(ResolveSubscriptionError::RetryExhausted {
                    key,
                    attempts,
                    source,
                });
            }
            Err(e) => {
                warn!(log, "failed to get owner cluster";
                      "cluster" => %key,
                      "attempt" => attempt,
                      "error" => %e);
                tokio::time::sleep(retry_interval).await;
                attempt += 1;
            }
        }
    }
}

/// An [`OwnerLookup`] over the clusters named in configuration files.
#[derive(Default)]
pub struct ConfigOwnerLookup {
    clusters: BTreeMap<ObjectKey, OwnerCluster>,
}

impl ConfigOwnerLookup {
    pub fn new<'a>(
        clusters: impl IntoIterator<Item = &'a ClusterConfig>,
    ) -> Self {
        let clusters = clusters
            .into_iter()
            .map(|c| {
                let key = ObjectKey {
                    namespace: c.namespace.clone(),
                    name: c.name.clone(),
                };
                let owner = OwnerCluster {
                    name: c.name.clone(),
                    subscription_id: c.subscription_id.clone(),
                };
                (key, owner)
            })
            .collect();
        Self { clusters }
    }
}

#[async_trait]
impl OwnerLookup for ConfigOwnerLookup {
    async fn get(&self, key: &ObjectKey) -> anyhow::Result<OwnerCluster> {
        self.clusters
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("cluster {key} not found"))
    }
}
