// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resource tags.
//!
//! Every resource the reconciler creates is tagged with the cluster that owns
//! it, so that resources left behind by a deleted cluster can be found.

use std::collections::BTreeMap;

pub type Tags = BTreeMap<String, String>;

pub const NAME_TAG: &str = "Name";

const TAG_PREFIX: &str = "stratus.io_";

/// The key of the tag recording a resource's role within its cluster.
pub const ROLE_TAG: &str = "stratus.io_role";

/// Returns the key of the tag that records `cluster_name`'s relationship to a
/// resource.
pub fn cluster_tag_key(cluster_name: &str) -> String {
    format!("{TAG_PREFIX}cluster_{cluster_name}")
}

/// How a resource relates to the cluster it is tagged with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceLifecycle {
    /// The cluster created the resource and deletes it with the cluster.
    Owned,
    /// The resource outlives the cluster.
    Shared,
}

pub struct BuildParams<'a> {
    pub cluster_name: &'a str,
    pub lifecycle: ResourceLifecycle,
    pub name: Option<&'a str>,
    pub role: Option<&'a str>,
    pub additional: &'a Tags,
}

/// Builds a resource's tag set. Additional tags are applied first, so they
/// can never overwrite the cluster, role, or name tags.
pub fn build(params: BuildParams<'_>) -> Tags {
    let mut tags = params.additional.clone();
    tags.insert(
        cluster_tag_key(params.cluster_name),
        params.lifecycle.to_string(),
    );
    if let Some(role) = params.role {
        tags.insert(ROLE_TAG.to_owned(), role.to_owned());
    }
    if let Some(name) = params.name {
        tags.insert(NAME_TAG.to_owned(), name.to_owned());
    }
    tags
}
