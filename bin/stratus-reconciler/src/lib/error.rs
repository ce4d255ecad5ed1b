// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use stratus_cloud::ProviderError;

/// Coarse classification shared by every error the reconciler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    /// The provider reported that a resource does not exist.
    NotFound,

    /// Any other provider failure. Not retried here.
    Provider,

    /// The declared state can't be turned into a provider request.
    Validation,

    /// A bounded retry loop gave up.
    RetryExhausted,
}

impl From<&ProviderError> for ErrorKind {
    fn from(err: &ProviderError) -> Self {
        if err.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::Provider
        }
    }
}
