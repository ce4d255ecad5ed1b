// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sources a VM's boot image can come from.

use serde::{Deserialize, Serialize};

/// The image a VM's OS disk is created from.
///
/// Exactly one source is ever active. When read from configuration this is a
/// table with a single key (`id`, `marketplace`, or `shared_gallery`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Image {
    /// A fully qualified provider image resource ID.
    Id(String),
    Marketplace(MarketplaceImage),
    SharedGallery(SharedGalleryImage),
}

/// An image published to the provider's marketplace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketplaceImage {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,

    /// Third-party images must be deployed with a purchase plan naming the
    /// publisher, offer and SKU.
    #[serde(default)]
    pub third_party_image: bool,
}

/// An image version stored in a shared image gallery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SharedGalleryImage {
    pub subscription_id: String,
    pub resource_group: String,
    pub gallery: String,
    pub name: String,
    pub version: String,
}

impl SharedGalleryImage {
    /// Returns the resource ID of this image version.
    pub fn resource_id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/galleries/{}/images/{}/versions/{}",
            self.subscription_id,
            self.resource_group,
            self.gallery,
            self.name,
            self.version
        )
    }
}
