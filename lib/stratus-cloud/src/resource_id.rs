// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Display;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource ID {0:?} does not start with /subscriptions/")]
    MissingSubscription(String),

    #[error("resource ID {0:?} names no resource group")]
    MissingResourceGroup(String),

    #[error("resource ID {0:?} names no provider")]
    MissingProvider(String),

    #[error("resource ID {0:?} has an unpaired type or name segment")]
    Unpaired(String),

    #[error("resource ID {0:?} has an empty segment")]
    EmptySegment(String),
}

/// A provider resource ID of the form
/// `/subscriptions/<sub>/resourceGroups/<rg>/providers/<namespace>/<type>/<name>`,
/// optionally followed by `/<child type>/<child name>` pairs.
///
/// The fixed keywords are matched case-insensitively; everything else is
/// preserved as given.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceId {
    subscription_id: String,
    resource_group: String,
    namespace: String,
    /// (type, name) pairs, outermost first. Never empty.
    segments: Vec<(String, String)>,
}

impl ResourceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            namespace: namespace.into(),
            segments: vec![(resource_type.into(), name.into())],
        }
    }

    /// Returns the ID of a resource nested under this one.
    pub fn child(
        &self,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let mut child = self.clone();
        child.segments.push((resource_type.into(), name.into()));
        child
    }

    #[inline]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    #[inline]
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The innermost resource's name.
    pub fn name(&self) -> &str {
        self.segments.last().map(|(_, name)| name.as_str()).unwrap_or("")
    }

    /// The full resource type, e.g. `virtualMachines` or
    /// `galleries/images/versions`.
    pub fn resource_type(&self) -> String {
        self.segments
            .iter()
            .map(|(ty, _)| ty.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Returns the name of the resource `id` refers to: its last non-empty
/// `/`-separated segment. Bare names are their own ID.
pub fn name_from_id(id: &str) -> Option<&str> {
    id.rsplit('/').find(|segment| !segment.is_empty())
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.strip_prefix('/').unwrap_or(s).split('/');

        let mut keyword = |expected: &str| match parts.next() {
            Some(k) if k.eq_ignore_ascii_case(expected) => parts.next(),
            _ => None,
        };
        let subscription_id = keyword("subscriptions")
            .ok_or_else(|| ResourceIdError::MissingSubscription(s.to_owned()))?;
        let resource_group = keyword("resourceGroups")
            .ok_or_else(|| ResourceIdError::MissingResourceGroup(s.to_owned()))?;
        let namespace = keyword("providers")
            .ok_or_else(|| ResourceIdError::MissingProvider(s.to_owned()))?;

        let rest: Vec<&str> = parts.collect();
        if rest.is_empty() || rest.len() % 2 != 0 {
            return Err(ResourceIdError::Unpaired(s.to_owned()));
        }

        let fields = [subscription_id, resource_group, namespace];
        if fields.iter().chain(rest.iter()).any(|f| f.is_empty()) {
            return Err(ResourceIdError::EmptySegment(s.to_owned()));
        }

        Ok(Self {
            subscription_id: subscription_id.to_owned(),
            resource_group: resource_group.to_owned(),
            namespace: namespace.to_owned(),
            segments: rest
                .chunks(2)
                .map(|pair| (pair[0].to_owned(), pair[1].to_owned()))
                .collect(),
        })
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}",
            self.subscription_id, self.resource_group, self.namespace
        )?;
        for (ty, name) in &self.segments {
            write!(f, "/{ty}/{name}")?;
        }
        Ok(())
    }
}

impl Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'d> Deserialize<'d> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const NIC: &str = "/subscriptions/123/resourceGroups/my-rg/providers/Microsoft.Network/networkInterfaces/my-vm-nic";

    #[test]
    fn parses_top_level_resources() {
        let id = ResourceId::from_str(NIC).unwrap();
        assert_eq!(id.subscription_id(), "123");
        assert_eq!(id.resource_group(), "my-rg");
        assert_eq!(id.namespace(), "Microsoft.Network");
        assert_eq!(id.resource_type(), "networkInterfaces");
        assert_eq!(id.name(), "my-vm-nic");
        assert_eq!(id.to_string(), NIC);
        assert_eq!(name_from_id(NIC), Some("my-vm-nic"));
    }

    #[test]
    fn names_from_partial_ids() {
        assert_eq!(name_from_id("my-nic-id"), Some("my-nic-id"));
        assert_eq!(name_from_id("second/fake/nic/id"), Some("id"));
        assert_eq!(name_from_id("fake/nic/"), Some("nic"));
        assert_eq!(name_from_id(""), None);
        assert_eq!(name_from_id("//"), None);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let id = ResourceId::from_str(
            "/Subscriptions/123/resourcegroups/RG/Providers/Microsoft.Compute/virtualMachines/vm",
        )
        .unwrap();
        assert_eq!(
            id,
            ResourceId::new(
                "123",
                "RG",
                "Microsoft.Compute",
                "virtualMachines",
                "vm"
            )
        );
    }

    #[test]
    fn nested_resources() {
        let gallery = ResourceId::new(
            "123",
            "rg",
            "Microsoft.Compute",
            "galleries",
            "g",
        );
        let version = gallery.child("images", "img").child("versions", "1.0.0");
        assert_eq!(version.resource_type(), "galleries/images/versions");
        assert_eq!(version.name(), "1.0.0");
        assert_eq!(
            ResourceId::from_str(&version.to_string()).unwrap(),
            version
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        for input in [
            "",
            "my-vm-nic",
            "/subscriptions/123",
            "/subscriptions/123/resourceGroups/rg",
            "/subscriptions/123/resourceGroups/rg/providers/Microsoft.Network",
            "/subscriptions/123/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces",
            "/subscriptions//resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic",
            "/subscriptions/123/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/",
        ] {
            assert!(
                ResourceId::from_str(input).is_err(),
                "expected error parsing {input:?}"
            );
        }
    }

    #[test]
    fn serialization() {
        use serde_test::{assert_tokens, Token};
        let id = ResourceId::from_str(NIC).unwrap();
        assert_tokens(&id, &[Token::Str(NIC)]);
    }
}
